//! Frame rendering: the serial per-tick loop and the worker-pool loops.
//!
//! A [`RenderCrew`] is a set of writer threads owned by one dispatcher worker.
//! Every tick the frame is cut into one [`WriteTask`] per writer, and the
//! coordinator waits on the [`TickBarrier`] for `chunks + 1` arrivals:
//!
//! - chunked mode: writers read the live [`Simulation`] through a shared
//!   `Arc`, the coordinator arrives as the last party, and once the barrier
//!   releases it takes the simulation back and injects and steps;
//! - overlapped (BSP) mode: the coordinator freezes the density field into a
//!   [`DensitySnapshot`] for the writers and hands the simulation to a
//!   dedicated simulation thread, which arrives as the last party after
//!   stepping.
//!
//! In both modes the simulation is mutated by exactly one thread at a time
//! while nobody reads it, so no lock guards the grid.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use kernel::{DensitySnapshot, DensitySource, KernelError};

use crate::barrier::TickBarrier;
use crate::error::{JobError, SinkError};
use crate::partition::{partition, Rect};
use crate::simulation::Simulation;
use crate::sink::{brightness, ImageSink};

/// Ticks between progress log lines.
const PROGRESS_INTERVAL: usize = 50;

/// Grey levels for one rectangle of a frame, row-major within the rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChunk {
    rect: Rect,
    pixels: Vec<u16>,
}

impl RenderedChunk {
    /// Area this chunk covers.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Converted pixels, row-major within [`rect`](Self::rect).
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Write the chunk into the open frame of `sink`.
    pub fn commit(&self, sink: &mut dyn ImageSink) -> Result<(), SinkError> {
        let width = self.rect.width();
        for (offset, &level) in self.pixels.iter().enumerate() {
            let x = self.rect.min_x + offset % width;
            let y = self.rect.min_y + offset / width;
            sink.set_pixel(x, y, level)?;
        }
        Ok(())
    }
}

/// Convert the density inside `rect` to grey levels.
pub fn render_chunk<S: DensitySource + ?Sized>(source: &S, rect: Rect) -> RenderedChunk {
    let mut pixels = Vec::with_capacity(rect.area());
    for y in rect.min_y..rect.max_y {
        for x in rect.min_x..rect.max_x {
            pixels.push(brightness(source.density(x, y)));
        }
    }
    RenderedChunk { rect, pixels }
}

fn log_progress(target: &str, tick: usize, length: usize) {
    if (tick + 1) % PROGRESS_INTERVAL == 0 {
        tracing::debug!("{}: tick {}/{}", target, tick + 1, length);
    }
}

/// Render every tick of `simulation` on the calling thread.
///
/// Each tick writes the current density as frame `tick`, then injects and
/// steps.
pub fn render_sequential(
    simulation: &mut Simulation,
    sink: &mut dyn ImageSink,
) -> Result<(), JobError> {
    let bounds = Rect::square(simulation.grid().size());
    let length = simulation.length();

    while simulation.tick() < length {
        let tick = simulation.tick();
        sink.new_frame(tick)?;
        render_chunk(simulation.grid(), bounds).commit(sink)?;

        simulation.update()?;
        simulation.step();
        log_progress(sink.target(), tick, length);
    }
    Ok(())
}

/// Density view shared by the writers of one tick.
pub type FrameSource = Arc<dyn DensitySource + Send + Sync>;

/// One chunk of one frame, to be converted by a writer thread.
#[derive(Clone)]
pub struct WriteTask {
    /// Pixels to convert
    pub rect: Rect,
    /// Density of the tick being written
    pub source: FrameSource,
}

type Advanced = (Simulation, Result<(), KernelError>);

struct StepperLinks {
    advance: Sender<Simulation>,
    advanced: Receiver<Advanced>,
}

struct CrewLinks {
    tasks: Sender<WriteTask>,
    chunks: Receiver<RenderedChunk>,
    stepper: Option<StepperLinks>,
}

/// Writer threads (plus a simulation thread when overlapped), owned by a
/// single dispatcher worker and reused for every job it runs.
///
/// Dropping the crew closes its channels and joins all threads.
pub struct RenderCrew {
    name: String,
    chunks: usize,
    barrier: Arc<TickBarrier>,
    links: Option<CrewLinks>,
    handles: Vec<JoinHandle<()>>,
}

impl RenderCrew {
    /// Spawn `chunks` writer threads (at least one). With `overlapped` a
    /// simulation thread is spawned too and ticks run in BSP mode.
    pub fn spawn(name: &str, chunks: usize, overlapped: bool) -> Result<Self, JobError> {
        let chunks = chunks.max(1);
        let barrier = Arc::new(TickBarrier::new(chunks + 1));

        let (task_tx, task_rx) = bounded::<WriteTask>(chunks);
        let (chunk_tx, chunk_rx) = bounded::<RenderedChunk>(chunks);

        let mut crew = Self {
            name: name.to_string(),
            chunks,
            barrier: Arc::clone(&barrier),
            links: Some(CrewLinks {
                tasks: task_tx,
                chunks: chunk_rx,
                stepper: None,
            }),
            handles: Vec::with_capacity(chunks + 1),
        };

        for i in 0..chunks {
            let tasks = task_rx.clone();
            let rendered = chunk_tx.clone();
            let barrier = Arc::clone(&barrier);
            let handle = thread::Builder::new()
                .name(format!("{name}-writer-{i}"))
                .spawn(move || writer_loop(tasks, rendered, barrier))
                .map_err(JobError::Spawn)?;
            crew.handles.push(handle);
        }

        if overlapped {
            let (advance_tx, advance_rx) = bounded::<Simulation>(1);
            let (advanced_tx, advanced_rx) = bounded::<Advanced>(1);
            let handle = thread::Builder::new()
                .name(format!("{name}-sim"))
                .spawn(move || simulation_loop(advance_rx, advanced_tx, barrier))
                .map_err(JobError::Spawn)?;
            crew.handles.push(handle);
            if let Some(links) = crew.links.as_mut() {
                links.stepper = Some(StepperLinks {
                    advance: advance_tx,
                    advanced: advanced_rx,
                });
            }
        }

        tracing::debug!(
            "{}: spawned {} writer(s), overlapped={}",
            name,
            chunks,
            overlapped
        );
        Ok(crew)
    }

    /// Number of frame chunks (writer parties) per tick.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Whether ticks overlap frame writing with the next step.
    pub fn is_overlapped(&self) -> bool {
        self.links
            .as_ref()
            .map_or(false, |links| links.stepper.is_some())
    }

    /// Render every tick of `simulation` and hand it back after its last tick.
    ///
    /// Frame `T` always shows the density before tick `T` injects and steps.
    /// Losing a helper thread leaves the crew unusable; later calls fail with
    /// [`JobError::WorkerLost`].
    pub fn render(
        &mut self,
        mut simulation: Simulation,
        sink: &mut dyn ImageSink,
    ) -> Result<Simulation, JobError> {
        let rects = partition(Rect::square(simulation.grid().size()), self.chunks);
        let length = simulation.length();

        while simulation.tick() < length {
            let tick = simulation.tick();
            sink.new_frame(tick)?;

            let (advanced, chunks) = match self.superstep(simulation, &rects) {
                Ok(round) => round,
                Err(err) => {
                    tracing::error!("{}: {}", self.name, err);
                    self.shutdown();
                    return Err(err);
                }
            };
            simulation = advanced.0;

            for chunk in &chunks {
                chunk.commit(sink)?;
            }
            advanced.1?;
            log_progress(sink.target(), tick, length);
        }
        Ok(simulation)
    }

    /// One tick: fan out, rendezvous, collect.
    fn superstep(
        &self,
        simulation: Simulation,
        rects: &[Rect],
    ) -> Result<(Advanced, Vec<RenderedChunk>), JobError> {
        let links = self.links.as_ref().ok_or(JobError::WorkerLost)?;
        let epoch = self.barrier.epoch();

        match &links.stepper {
            Some(stepper) => {
                let snapshot = Arc::new(DensitySnapshot::capture(simulation.grid()));
                for &rect in rects {
                    let task = WriteTask {
                        rect,
                        source: Arc::clone(&snapshot) as _,
                    };
                    links.tasks.send(task).map_err(|_| JobError::WorkerLost)?;
                }
                stepper
                    .advance
                    .send(simulation)
                    .map_err(|_| JobError::WorkerLost)?;

                self.barrier.wait(epoch).map_err(|_| JobError::WorkerLost)?;
                let advanced = stepper
                    .advanced
                    .try_recv()
                    .map_err(|_| JobError::WorkerLost)?;
                let chunks = collect_chunks(&links.chunks, rects.len())?;
                Ok((advanced, chunks))
            }
            None => {
                let live = Arc::new(simulation);
                for &rect in rects {
                    let task = WriteTask {
                        rect,
                        source: Arc::clone(&live) as _,
                    };
                    links.tasks.send(task).map_err(|_| JobError::WorkerLost)?;
                }
                // The coordinator stands in for the simulation party.
                self.barrier.arrive();
                self.barrier.wait(epoch).map_err(|_| JobError::WorkerLost)?;
                let chunks = collect_chunks(&links.chunks, rects.len())?;

                // Writers drop their task before arriving.
                let mut simulation = Arc::try_unwrap(live).map_err(|_| JobError::WorkerLost)?;
                let result = simulation.update().map(|_| ());
                if result.is_ok() {
                    simulation.step();
                }
                Ok(((simulation, result), chunks))
            }
        }
    }

    fn shutdown(&mut self) {
        self.links = None;
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("{}: helper thread panicked", self.name);
            }
        }
    }
}

impl Drop for RenderCrew {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Every party sends before it arrives, so after release all chunks are queued.
fn collect_chunks(
    chunks: &Receiver<RenderedChunk>,
    count: usize,
) -> Result<Vec<RenderedChunk>, JobError> {
    (0..count)
        .map(|_| chunks.try_recv())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| JobError::WorkerLost)
}

fn writer_loop(tasks: Receiver<WriteTask>, rendered: Sender<RenderedChunk>, barrier: Arc<TickBarrier>) {
    let _guard = barrier.guard();
    for task in tasks.iter() {
        let chunk = render_chunk(task.source.as_ref(), task.rect);
        drop(task);
        if rendered.send(chunk).is_err() {
            break;
        }
        barrier.arrive();
    }
}

fn simulation_loop(
    advance: Receiver<Simulation>,
    advanced: Sender<Advanced>,
    barrier: Arc<TickBarrier>,
) {
    let _guard = barrier.guard();
    for mut simulation in advance.iter() {
        let result = simulation.update().map(|_| ());
        if result.is_ok() {
            simulation.step();
        }
        if advanced.send((simulation, result)).is_err() {
            break;
        }
        barrier.arrive();
    }
}

/// Drive `simulation` to its last tick, through `crew` when given and on the
/// calling thread otherwise.
pub fn render_job(
    simulation: Simulation,
    sink: &mut dyn ImageSink,
    crew: Option<&mut RenderCrew>,
) -> Result<Simulation, JobError> {
    match crew {
        Some(crew) => crew.render(simulation, sink),
        None => {
            let mut simulation = simulation;
            render_sequential(&mut simulation, sink)?;
            Ok(simulation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FrameRecorder;
    use kernel::{FluidGrid, DEFAULT_DT};

    #[test]
    fn test_render_chunk_covers_rect() {
        let mut grid = FluidGrid::new(6, 0.0, 0.0, DEFAULT_DT).unwrap();
        grid.add_density(3, 2, 0.5).unwrap();
        grid.add_density(4, 4, 2.0).unwrap();

        let rect = Rect::new(2, 1, 5, 5);
        let chunk = render_chunk(&grid, rect);
        assert_eq!(chunk.pixels().len(), rect.area());
        // (3, 2) is column 1, row 1 of the chunk.
        assert_eq!(chunk.pixels()[1 + 3], 32767);
        // (4, 4) is column 2, row 3.
        assert_eq!(chunk.pixels()[2 + 3 * 3], 65535);
        assert_eq!(chunk.pixels().iter().filter(|&&p| p != 0).count(), 2);
    }

    #[test]
    fn test_commit_places_pixels() {
        let mut grid = FluidGrid::new(4, 0.0, 0.0, DEFAULT_DT).unwrap();
        grid.add_density(2, 3, 1.0).unwrap();

        let recorder = FrameRecorder::new("chunks", 4, 4);
        let mut sink = recorder.clone();
        sink.new_frame(0).unwrap();
        for rect in partition(Rect::square(4), 3) {
            render_chunk(&grid, rect).commit(&mut sink).unwrap();
        }

        let frame = &recorder.frames()[0];
        assert_eq!(frame[2 + 3 * 4], 65535);
        assert_eq!(frame.iter().filter(|&&p| p != 0).count(), 1);
    }

    #[test]
    fn test_crew_threads_stop_on_drop() {
        let crew = RenderCrew::spawn("test-crew", 3, true).unwrap();
        assert_eq!(crew.chunks(), 3);
        assert_eq!(crew.barrier.parties(), 4);
        assert_eq!(crew.handles.len(), 4);
        assert!(crew.is_overlapped());
        drop(crew);

        let crew = RenderCrew::spawn("test-chunked", 2, false).unwrap();
        assert_eq!(crew.barrier.parties(), 3);
        assert_eq!(crew.handles.len(), 2);
        assert!(!crew.is_overlapped());
    }

    #[test]
    fn test_chunked_crew_returns_simulation_after_every_tick() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let grid = FluidGrid::new(9, 100.0, 1.0, DEFAULT_DT).unwrap();
        let simulation = Simulation::new(
            grid,
            6,
            crate::simulation::InjectionPolicy::Random,
            1,
            false,
            StdRng::seed_from_u64(21),
        );
        let recorder = FrameRecorder::new("chunked", 9, 9);
        let mut sink = recorder.clone();

        let mut crew = RenderCrew::spawn("chunked", 4, false).unwrap();
        let simulation = crew.render(simulation, &mut sink).unwrap();
        assert_eq!(simulation.tick(), 6);
        assert_eq!(recorder.frames().len(), 6);
        assert_eq!(crew.barrier.epoch(), 6);
    }
}

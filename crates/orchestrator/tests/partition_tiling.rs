//! Partition: chunks exactly tile the frame, equal except the last.

use orchestrator::{partition, Rect};

fn assert_tiles(bounds: Rect, parts: usize) {
    let chunks = partition(bounds, parts);
    assert_eq!(chunks.len(), parts.max(1));

    // Every pixel is covered exactly once.
    for y in bounds.min_y..bounds.max_y {
        for x in bounds.min_x..bounds.max_x {
            let owners = chunks.iter().filter(|c| c.contains(x, y)).count();
            assert_eq!(owners, 1, "pixel ({x}, {y}) of {bounds:?} split {parts} ways");
        }
    }
    // Nothing outside.
    for chunk in &chunks {
        assert!(chunk.min_x >= bounds.min_x && chunk.max_x <= bounds.max_x);
        assert!(chunk.min_y >= bounds.min_y && chunk.max_y <= bounds.max_y);
    }
    let total: usize = chunks.iter().map(Rect::area).sum();
    assert_eq!(total, bounds.area());

    if parts > 1 {
        let split_x = bounds.width() > bounds.height();
        let extent = |r: &Rect| if split_x { r.width() } else { r.height() };
        let first = extent(&chunks[0]);
        for chunk in &chunks[..parts - 1] {
            assert_eq!(extent(chunk), first);
        }
        assert!(extent(&chunks[parts - 1]) >= first);
    }
}

#[test]
fn test_partitions_tile_exactly() {
    let rects = [
        Rect::square(1),
        Rect::square(16),
        Rect::square(37),
        Rect::new(0, 0, 50, 9),
        Rect::new(0, 0, 9, 50),
        Rect::new(3, 5, 24, 12),
    ];
    for bounds in rects {
        for parts in 1..=9 {
            assert_tiles(bounds, parts);
        }
    }
}

#[test]
fn test_longer_side_is_cut() {
    // Wider than tall: columns.
    for chunk in partition(Rect::new(0, 0, 30, 10), 3) {
        assert_eq!(chunk.height(), 10);
        assert_eq!(chunk.width(), 10);
    }
    // Taller than wide: rows.
    for chunk in partition(Rect::new(0, 0, 10, 30), 3) {
        assert_eq!(chunk.width(), 10);
        assert_eq!(chunk.height(), 10);
    }
}

#[test]
fn test_remainder_goes_to_last_chunk() {
    let chunks = partition(Rect::square(10), 4);
    let heights: Vec<usize> = chunks.iter().map(Rect::height).collect();
    assert_eq!(heights, vec![2, 2, 2, 4]);
}

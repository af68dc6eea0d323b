//! Frame decomposition into contiguous chunks for parallel writers.

/// Half-open pixel rectangle `[min_x, max_x) x [min_y, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge (inclusive)
    pub min_x: usize,
    /// Top edge (inclusive)
    pub min_y: usize,
    /// Right edge (exclusive)
    pub max_x: usize,
    /// Bottom edge (exclusive)
    pub max_y: usize,
}

impl Rect {
    /// Create a rectangle from its corners.
    pub fn new(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> Self {
        debug_assert!(min_x <= max_x && min_y <= max_y);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The `size x size` rectangle anchored at the origin.
    pub fn square(size: usize) -> Self {
        Self::new(0, 0, size, size)
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.max_x - self.min_x
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.max_y - self.min_y
    }

    /// Pixel count
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// Whether `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Whether the rectangle covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

/// Split `bounds` into `parts` contiguous rectangles that exactly tile it.
///
/// The longer side is cut (ties cut along y) into equal floor-sized
/// increments, and the last rectangle absorbs the remainder. `parts <= 1`
/// returns `bounds` unchanged. Asking for more parts than the cut side has
/// pixels yields leading empty rectangles.
pub fn partition(bounds: Rect, parts: usize) -> Vec<Rect> {
    if parts <= 1 {
        return vec![bounds];
    }

    let split_x = bounds.width() > bounds.height();
    let extent = if split_x { bounds.width() } else { bounds.height() };
    let increment = extent / parts;

    (0..parts)
        .map(|k| {
            let start = k * increment;
            let end = if k + 1 == parts { extent } else { start + increment };
            if split_x {
                Rect::new(
                    bounds.min_x + start,
                    bounds.min_y,
                    bounds.min_x + end,
                    bounds.max_y,
                )
            } else {
                Rect::new(
                    bounds.min_x,
                    bounds.min_y + start,
                    bounds.max_x,
                    bounds.min_y + end,
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_part_is_identity() {
        let bounds = Rect::new(2, 3, 10, 7);
        assert_eq!(partition(bounds, 0), vec![bounds]);
        assert_eq!(partition(bounds, 1), vec![bounds]);
    }

    #[test]
    fn test_wide_rect_splits_along_x() {
        let parts = partition(Rect::new(0, 0, 10, 4), 3);
        assert_eq!(
            parts,
            vec![
                Rect::new(0, 0, 3, 4),
                Rect::new(3, 0, 6, 4),
                Rect::new(6, 0, 10, 4),
            ]
        );
    }

    #[test]
    fn test_square_splits_along_y() {
        let parts = partition(Rect::square(8), 4);
        for (k, part) in parts.iter().enumerate() {
            assert_eq!(part.min_x, 0);
            assert_eq!(part.max_x, 8);
            assert_eq!(part.min_y, 2 * k);
            assert_eq!(part.height(), 2);
        }
    }

    #[test]
    fn test_contains_is_half_open() {
        let rect = Rect::new(1, 1, 3, 3);
        assert!(rect.contains(1, 1));
        assert!(rect.contains(2, 2));
        assert!(!rect.contains(3, 2));
        assert!(!rect.contains(2, 0));
        assert!(Rect::new(4, 4, 4, 9).is_empty());
    }
}

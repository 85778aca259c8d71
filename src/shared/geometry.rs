//! Window geometry as reported by the X server.

/// Window geometry
///
/// `width` and `height` describe the client area; the border is drawn outside
/// of it, so the on-screen extent is `width + 2 * border_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height, border_width: 0 }
    }

    pub fn with_border(mut self, border_width: u32) -> Self {
        self.border_width = border_width;
        self
    }

    /// Width including both borders
    pub fn outer_width(&self) -> u32 {
        self.width + 2 * self.border_width
    }

    /// Height including both borders
    pub fn outer_height(&self) -> u32 {
        self.height + 2 * self.border_width
    }

    pub fn moved_to(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    pub fn resized_to(self, width: u32, height: u32) -> Self {
        Self { width, height, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_extent_counts_both_borders() {
        let geom = Geometry::new(10, 20, 500, 400).with_border(2);
        assert_eq!(geom.outer_width(), 504);
        assert_eq!(geom.outer_height(), 404);
    }

    #[test]
    fn test_move_keeps_size_and_border() {
        let geom = Geometry::new(0, 0, 300, 200).with_border(3).moved_to(-5, 40);
        assert_eq!(geom, Geometry::new(-5, 40, 300, 200).with_border(3));
    }
}

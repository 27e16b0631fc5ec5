use glam::Vec2;

/// Turns absolute cursor positions into look offsets.
///
/// The first position only primes the tracker so the camera does not jump
/// when the cursor enters the window. The Y offset is inverted: moving the
/// cursor up yields a positive offset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorTracker {
    last: Option<Vec2>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_cursor_moved(&mut self, x: f64, y: f64) -> Vec2 {
        let position = Vec2::new(x as f32, y as f32);
        let last = self.last.replace(position).unwrap_or(position);
        Vec2::new(position.x - last.x, last.y - position.y)
    }

    /// Forget the last position; the next event primes the tracker again.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_position(&self) -> Option<Vec2> {
        self.last
    }
}

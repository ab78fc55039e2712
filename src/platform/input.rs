//! Screen-to-world input mapping
//!
//! The projection itself belongs to the presentation layer; the engine only
//! guarantees that the result is clamped to the drop range.

/// Maps a screen position to a world-space x on the drop line
pub trait ScreenProjector {
    fn screen_to_world_x(&self, screen_x: f32, screen_y: f32) -> f32;
}

/// Orthographic fallback: the viewport width spans `world_span` world units
#[derive(Debug, Clone, Copy)]
pub struct LinearProjector {
    pub viewport_width: f32,
    pub world_span: f32,
}

impl LinearProjector {
    pub fn new(viewport_width: f32, world_span: f32) -> Self {
        Self {
            viewport_width: viewport_width.max(1.0),
            world_span,
        }
    }
}

impl ScreenProjector for LinearProjector {
    fn screen_to_world_x(&self, screen_x: f32, _screen_y: f32) -> f32 {
        let t = screen_x / self.viewport_width - 0.5;
        t * self.world_span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_projector_center_is_zero() {
        let p = LinearProjector::new(800.0, 6.0);
        assert!(p.screen_to_world_x(400.0, 100.0).abs() < 1e-6);
        assert!((p.screen_to_world_x(800.0, 0.0) - 3.0).abs() < 1e-6);
        assert!((p.screen_to_world_x(0.0, 0.0) + 3.0).abs() < 1e-6);
    }
}

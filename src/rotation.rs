/// Radians added to the scene's Y rotation per unpaused frame.
pub const ROTATION_STEP: f64 = 0.0005;

/// Next rotation angle: advances by [`ROTATION_STEP`] unless paused.
pub fn advance_rotation(angle: f64, paused: bool) -> f64 {
    if paused { angle } else { angle + ROTATION_STEP }
}

/// Per-frame accumulator for the scene's idle rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationDriver {
    angle: f64,
    step: f64,
}

impl Default for RotationDriver {
    fn default() -> Self {
        Self::new(ROTATION_STEP)
    }
}

impl RotationDriver {
    pub fn new(step: f64) -> Self {
        Self { angle: 0.0, step }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn advance(&mut self, paused: bool) -> f64 {
        if !paused {
            self.angle += self.step;
        }
        self.angle
    }
}

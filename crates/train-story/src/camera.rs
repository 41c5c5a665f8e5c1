use rand::Rng;
use serde::{Deserialize, Serialize};

/// Offset and tilt applied to the whole scene, in px and degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraTransform {
    pub x: f64,
    pub y: f64,
    pub rotate_deg: f64,
}

impl CameraTransform {
    pub fn css(&self) -> String {
        if self.rotate_deg == 0.0 {
            format!("translate({}px, {}px)", self.x, self.y)
        } else {
            format!("translate({}px, {}px) rotate({}deg)", self.x, self.y, self.rotate_deg)
        }
    }
}

/// Panic above this level tilts the carriage as well as shaking it.
const TILT_THRESHOLD: f64 = 0.7;

/// Carriage sway at `time_s`: a slow side-to-side roll, periodic track bumps,
/// random jitter, and an extra lurch driven by panic.
pub fn camera_transform<R: Rng>(time_s: f64, shake: f64, panic: f64, rng: &mut R) -> CameraTransform {
    let base = shake * 10.0;

    let sway = (time_s * 1.5).sin() * base * 0.7;
    let bump = if (time_s * 0.7).sin() > 0.7 {
        (time_s * 20.0).sin() * base * 0.3
    } else {
        0.0
    };
    let jitter_x = (rng.random::<f64>() - 0.5) * base * 0.2;
    let jitter_y = (rng.random::<f64>() - 0.5) * base * 0.2;

    let mut x = sway + jitter_x;
    let y = bump + jitter_y;
    let mut rotate_deg = 0.0;

    if panic > 0.0 {
        let lurch = (time_s * 3.0).sin() * panic * 5.0;
        x += lurch;
        if panic > TILT_THRESHOLD {
            rotate_deg = lurch * 0.1;
        }
    }

    CameraTransform { x, y, rotate_deg }
}

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Scene parameters a host maps onto the rendered train carriage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualParams {
    /// Beats per minute of the simulated heart.
    pub heart_rate: f64,
    pub camera_shake: f64,
    /// Brightness multiplier, 0 is black.
    pub light_level: f64,
    /// Blur radius in pixels.
    pub blur: f64,
    pub vignette: f64,
    /// 0 (calm) to 1 (full panic).
    pub panic_level: f64,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            heart_rate: 70.0,
            camera_shake: 0.0,
            light_level: 0.7,
            blur: 0.0,
            vignette: 0.0,
            panic_level: 0.0,
        }
    }
}

/// Floor for heart rate when breathing eases it.
pub const RESTING_HEART_RATE: f64 = 60.0;

impl VisualParams {
    /// Recompute the parameters for `stage` at fractional progress `p`
    /// (line index over line count). Fields a stage does not drive keep
    /// their previous value.
    pub fn apply(&mut self, stage: Stage, p: f64) {
        let p = p.clamp(0.0, 1.0);
        match stage {
            Stage::WakeUp => {
                self.heart_rate = 70.0 + p * 10.0;
                self.camera_shake = 0.2 + p * 0.3;
                self.light_level = 0.4 - p * 0.1;
                self.vignette = 0.3 + p * 0.2;
            }
            Stage::Anxiety => {
                self.heart_rate = 80.0 + p * 20.0;
                self.camera_shake = 0.5 + p * 0.5;
                self.light_level = 0.3 - p * 0.1;
                self.blur = 1.0 + p * 2.0;
                self.vignette = 0.5 + p * 0.3;
                self.panic_level = 0.3 + p * 0.4;
            }
            Stage::Peak => {
                self.heart_rate = 100.0 + p * 30.0;
                self.camera_shake = 1.0 + p * 0.5;
                self.light_level = 0.2 - p * 0.05;
                self.blur = 3.0 + p * 3.0;
                self.vignette = 0.8 + p * 0.2;
                self.panic_level = 0.7 + p * 0.3;
            }
            Stage::Recovery => {
                self.heart_rate = (100.0 - p * 30.0).max(70.0);
                self.camera_shake = (0.7 - p * 0.6).max(0.1);
                self.light_level = 0.3 + p * 0.3;
                self.blur = (2.0 - p * 2.0).max(0.0);
                self.vignette = (0.7 - p * 0.5).max(0.2);
                self.panic_level = (0.6 - p * 0.6).max(0.0);
            }
            Stage::Calm => {
                self.heart_rate = (70.0 - p * 10.0).max(RESTING_HEART_RATE);
                self.camera_shake = (0.1 - p * 0.05).max(0.05);
                self.light_level = 0.6 + p * 0.2;
                self.blur = 0.0;
                self.vignette = (0.2 - p * 0.1).max(0.1);
                self.panic_level = 0.0;
            }
            Stage::Arrival => {
                self.heart_rate = RESTING_HEART_RATE;
                self.camera_shake = 0.0;
                self.light_level = 0.8 + p * 0.2;
                self.blur = 0.0;
                self.vignette = 0.1;
            }
            // Turning holds whatever peak left behind
            Stage::Turning | Stage::Start | Stage::WarpIn | Stage::EyesOpening => {}
        }
    }

    /// Each completed breath slows the heart a little.
    pub fn ease_heart(&mut self, by: f64) {
        self.heart_rate = (self.heart_rate - by).max(RESTING_HEART_RATE);
    }

    /// CSS filter for the background scene.
    pub fn scene_filter(&self) -> String {
        format!(
            "brightness({}) contrast(1.05) saturate(0.9) blur({}px)",
            self.light_level, self.blur
        )
    }

    /// Inner radius (percent) of the vignette gradient.
    pub fn vignette_clear_radius(&self) -> f64 {
        (50.0 - self.vignette * 40.0).max(0.0)
    }
}

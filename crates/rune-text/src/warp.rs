//! Warp presets: synthetic baselines across a text box for curve layout.

use std::f64::consts::PI;

use engine_core::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WarpSpec {
    /// Bend in [-1, 1]; positive arches the middle upward. At ±1 the sag is
    /// half the box width.
    Arc { bend: f64 },
    /// Sine baseline with `cycles` full periods across the box.
    Wave {
        amplitude: f64,
        #[serde(default = "default_cycles")]
        cycles: f64,
    },
}

fn default_cycles() -> f64 {
    1.0
}

const WARP_POINTS: usize = 128;

impl WarpSpec {
    /// Baseline polyline from the left to the right edge of a `width`×`height`
    /// box, centered vertically.
    pub fn baseline(&self, width: f64, height: f64) -> Vec<Point> {
        let cy = height * 0.5;
        (0..=WARP_POINTS)
            .map(|i| {
                let u = i as f64 / WARP_POINTS as f64;
                let x = width * u;
                let y = match *self {
                    WarpSpec::Arc { bend } => {
                        let t = 2.0 * u - 1.0;
                        cy - bend.clamp(-1.0, 1.0) * width * 0.5 * (1.0 - t * t)
                    }
                    WarpSpec::Wave { amplitude, cycles } => {
                        cy + amplitude * (2.0 * PI * cycles * u).sin()
                    }
                };
                Point::new(x, y)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_peaks_in_the_middle() {
        let pts = WarpSpec::Arc { bend: 0.5 }.baseline(100.0, 40.0);
        assert_eq!(pts.len(), WARP_POINTS + 1);
        assert_eq!(pts[0].y, 20.0);
        let mid = pts[WARP_POINTS / 2];
        assert!((mid.y - (20.0 - 25.0)).abs() < 1e-9);
    }

    #[test]
    fn wave_deserializes_with_default_cycles() {
        let w: WarpSpec = serde_json::from_str(r#"{"type":"wave","amplitude":4}"#).unwrap();
        assert_eq!(w, WarpSpec::Wave { amplitude: 4.0, cycles: 1.0 });
    }
}

//! Alignment evaluation against target parameters.
//!
//! Compares the live device attitude to the computed target and produces a
//! per-axis verdict with a progress indicator for guidance display.

use serde::{Deserialize, Serialize};

use crate::angles::{normalize_bearing, signed_delta};
use crate::target::TargetParameters;
use crate::types::Attitude;

/// Acceptance thresholds and progress spans for the three guidance axes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlignmentTolerances {
    /// Acceptable bearing error, degrees either side of the target.
    pub azimuth_threshold: f64,
    /// Acceptable tilt error, degrees.
    pub tilt_threshold: f64,
    /// Acceptable roll error, degrees.
    pub roll_threshold: f64,
    /// Bearing error at which azimuth progress reads zero.
    pub azimuth_span: f64,
    /// Tilt error at which tilt progress reads zero.
    pub tilt_span: f64,
    /// Roll error at which roll progress reads zero.
    pub roll_span: f64,
}

impl Default for AlignmentTolerances {
    fn default() -> Self {
        Self {
            azimuth_threshold: 5.0,
            tilt_threshold: 3.0,
            roll_threshold: 3.0,
            azimuth_span: 45.0,
            tilt_span: 30.0,
            roll_span: 30.0,
        }
    }
}

/// Per-axis alignment result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisCheck {
    /// Whether the axis is within tolerance.
    pub correct: bool,
    /// Closeness indicator in [0, 1]; exactly 1.0 once within tolerance.
    pub progress: f64,
    /// Signed error in degrees. Positive means the underlying angle must
    /// increase: rotate clockwise for azimuth, tilt further up for tilt.
    pub deviation: f64,
}

/// Combined three-axis verdict for the current device attitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentVerdict {
    pub azimuth: AxisCheck,
    pub tilt: AxisCheck,
    pub roll: AxisCheck,
    /// Bearing the device itself must face: the panel bearing flipped by a
    /// half turn, since the device back points where the panel front will.
    pub device_target_azimuth: f64,
    /// True when all three axes are within tolerance.
    pub aligned: bool,
}

/// Evaluate the device attitude against the target.
///
/// The device is held with its back facing the panel direction, so the
/// bearing target is flipped 180 degrees and the pitch sign is inverted
/// before comparison. Roll is always steered toward level.
///
/// `simulate_aligned` short-circuits every axis to a perfect result while
/// keeping the computed bearing target visible. It is an explicit input so
/// demo behavior stays out of the evaluation logic itself.
pub fn evaluate(
    attitude: &Attitude,
    target: &TargetParameters,
    tolerances: &AlignmentTolerances,
    simulate_aligned: bool,
) -> AlignmentVerdict {
    let device_target_azimuth = normalize_bearing(target.panel_azimuth() + 180.0);

    if simulate_aligned {
        let perfect = AxisCheck {
            correct: true,
            progress: 1.0,
            deviation: 0.0,
        };
        return AlignmentVerdict {
            azimuth: perfect,
            tilt: perfect,
            roll: perfect,
            device_target_azimuth,
            aligned: true,
        };
    }

    let azimuth = axis_check(
        signed_delta(attitude.azimuth, device_target_azimuth),
        tolerances.azimuth_threshold,
        tolerances.azimuth_span,
    );
    // Device pitch runs opposite to panel tilt: tilting the top edge up
    // reads negative.
    let tilt = axis_check(
        target.target_tilt - (-attitude.pitch),
        tolerances.tilt_threshold,
        tolerances.tilt_span,
    );
    let roll = axis_check(
        -attitude.roll,
        tolerances.roll_threshold,
        tolerances.roll_span,
    );
    let aligned = azimuth.correct && tilt.correct && roll.correct;

    AlignmentVerdict {
        azimuth,
        tilt,
        roll,
        device_target_azimuth,
        aligned,
    }
}

fn axis_check(deviation: f64, threshold: f64, span: f64) -> AxisCheck {
    let correct = deviation.abs() <= threshold;
    let progress = if correct {
        1.0
    } else {
        (1.0 - deviation.abs() / span).clamp(0.0, 1.0)
    };
    AxisCheck {
        correct,
        progress,
        deviation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TiltMode;
    use approx::assert_relative_eq;

    fn target(true_azimuth: f64, magnetic_azimuth: Option<f64>, tilt: f64) -> TargetParameters {
        TargetParameters {
            target_true_azimuth: true_azimuth,
            target_magnetic_azimuth: magnetic_azimuth,
            target_tilt: tilt,
            mode: TiltMode::Winter,
            magnetic_declination: magnetic_azimuth.map(|m| true_azimuth - m),
        }
    }

    fn attitude(azimuth: f64, pitch: f64, roll: f64) -> Attitude {
        Attitude {
            azimuth,
            pitch,
            roll,
            accuracy: None,
        }
    }

    #[test]
    fn device_bearing_is_panel_bearing_flipped() {
        let verdict = evaluate(
            &attitude(0.0, 0.0, 0.0),
            &target(180.0, None, 0.0),
            &AlignmentTolerances::default(),
            false,
        );
        assert_relative_eq!(verdict.device_target_azimuth, 0.0);

        let verdict = evaluate(
            &attitude(0.0, 0.0, 0.0),
            &target(350.0, None, 0.0),
            &AlignmentTolerances::default(),
            false,
        );
        assert_relative_eq!(verdict.device_target_azimuth, 170.0);
    }

    #[test]
    fn magnetic_bearing_takes_precedence() {
        let verdict = evaluate(
            &attitude(0.0, 0.0, 0.0),
            &target(180.0, Some(182.0), 0.0),
            &AlignmentTolerances::default(),
            false,
        );
        assert_relative_eq!(verdict.device_target_azimuth, 2.0);
    }

    #[test]
    fn perfectly_held_device_is_aligned() {
        let verdict = evaluate(
            &attitude(0.0, -40.0, 0.0),
            &target(180.0, None, 40.0),
            &AlignmentTolerances::default(),
            false,
        );
        assert!(verdict.aligned);
        assert_relative_eq!(verdict.azimuth.progress, 1.0);
        assert_relative_eq!(verdict.tilt.progress, 1.0);
        assert_relative_eq!(verdict.roll.progress, 1.0);
        assert_relative_eq!(verdict.tilt.deviation, 0.0);
    }

    #[test]
    fn inverted_pitch_counts_toward_tilt() {
        // Device pitched up by 13 degrees reads -13; against a 12 degree
        // target that is a 1 degree error, within tolerance.
        let verdict = evaluate(
            &attitude(0.0, -13.0, 0.0),
            &target(180.0, None, 12.0),
            &AlignmentTolerances::default(),
            false,
        );
        assert!(verdict.tilt.correct);
        assert_relative_eq!(verdict.tilt.deviation, -1.0);
        assert_relative_eq!(verdict.tilt.progress, 1.0);
    }

    #[test]
    fn azimuth_errors_wrap_the_short_way() {
        // Device target is 170; reading 175 is five degrees past it.
        let verdict = evaluate(
            &attitude(175.0, 0.0, 0.0),
            &target(350.0, None, 0.0),
            &AlignmentTolerances::default(),
            false,
        );
        assert!(verdict.azimuth.correct);
        assert_relative_eq!(verdict.azimuth.deviation, -5.0);
    }

    #[test]
    fn threshold_is_inclusive_and_progress_snaps_to_one() {
        let tolerances = AlignmentTolerances::default();
        let verdict = evaluate(
            &attitude(355.0, 0.0, 0.0),
            &target(180.0, None, 0.0),
            &tolerances,
            false,
        );
        assert!(verdict.azimuth.correct);
        assert_relative_eq!(verdict.azimuth.deviation, 5.0);
        assert_relative_eq!(verdict.azimuth.progress, 1.0);

        let verdict = evaluate(
            &attitude(354.0, 0.0, 0.0),
            &target(180.0, None, 0.0),
            &tolerances,
            false,
        );
        assert!(!verdict.azimuth.correct);
        assert_relative_eq!(verdict.azimuth.deviation, 6.0);
        assert_relative_eq!(verdict.azimuth.progress, 1.0 - 6.0 / 45.0);
    }

    #[test]
    fn progress_bottoms_out_at_zero() {
        let verdict = evaluate(
            &attitude(90.0, 0.0, 0.0),
            &target(90.0, None, 0.0),
            &AlignmentTolerances::default(),
            false,
        );
        // Device target 270, reading 90: a full half turn off.
        assert_relative_eq!(verdict.azimuth.progress, 0.0);
    }

    #[test]
    fn roll_steers_toward_level() {
        let tolerances = AlignmentTolerances::default();
        let verdict = evaluate(
            &attitude(0.0, 0.0, 2.0),
            &target(180.0, None, 0.0),
            &tolerances,
            false,
        );
        assert!(verdict.roll.correct);
        assert_relative_eq!(verdict.roll.deviation, -2.0);

        let verdict = evaluate(
            &attitude(0.0, 0.0, -10.0),
            &target(180.0, None, 0.0),
            &tolerances,
            false,
        );
        assert!(!verdict.roll.correct);
        assert_relative_eq!(verdict.roll.deviation, 10.0);
        assert_relative_eq!(verdict.roll.progress, 1.0 - 10.0 / 30.0);
    }

    #[test]
    fn aligned_requires_all_three_axes() {
        let verdict = evaluate(
            &attitude(0.0, -40.0, 20.0),
            &target(180.0, None, 40.0),
            &AlignmentTolerances::default(),
            false,
        );
        assert!(verdict.azimuth.correct);
        assert!(verdict.tilt.correct);
        assert!(!verdict.roll.correct);
        assert!(!verdict.aligned);
    }

    #[test]
    fn simulated_alignment_reports_perfect_axes() {
        let verdict = evaluate(
            &attitude(123.0, 45.0, -60.0),
            &target(350.0, Some(352.0), 40.0),
            &AlignmentTolerances::default(),
            true,
        );
        assert!(verdict.aligned);
        for check in [verdict.azimuth, verdict.tilt, verdict.roll] {
            assert!(check.correct);
            assert_relative_eq!(check.progress, 1.0);
            assert_relative_eq!(check.deviation, 0.0);
        }
        // The bearing target stays real so the display can keep showing it.
        assert_relative_eq!(verdict.device_target_azimuth, 172.0);
    }
}

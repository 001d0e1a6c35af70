//! Terminal rendering of guidance state.

use guidance::{AxisCheck, GuidanceSnapshot, TiltMode};

/// Human readable name of a tilt strategy.
pub fn mode_title(mode: TiltMode) -> &'static str {
    match mode {
        TiltMode::YearRound => "Year-round",
        TiltMode::Summer => "Summer",
        TiltMode::Winter => "Winter",
        TiltMode::SpringAutumn => "Spring and autumn",
        TiltMode::Realtime => "Real-time sun tracking",
    }
}

/// Parse a strategy name as written on the command line.
pub fn parse_mode(name: &str) -> Option<TiltMode> {
    match name {
        "year_round" => Some(TiltMode::YearRound),
        "summer" => Some(TiltMode::Summer),
        "winter" => Some(TiltMode::Winter),
        "spring_autumn" => Some(TiltMode::SpringAutumn),
        "realtime" => Some(TiltMode::Realtime),
        _ => None,
    }
}

/// Bearing adjustment hint, `None` when the axis is within tolerance.
pub fn azimuth_hint(check: &AxisCheck) -> Option<String> {
    if check.correct {
        None
    } else if check.deviation > 0.0 {
        Some(format!("rotate right {:.0} deg", check.deviation))
    } else {
        Some(format!("rotate left {:.0} deg", -check.deviation))
    }
}

/// Tilt adjustment hint. Positive deviation means the device needs to tilt
/// further up from horizontal.
pub fn tilt_hint(check: &AxisCheck) -> Option<String> {
    if check.correct {
        None
    } else if check.deviation > 0.0 {
        Some(format!("tilt up {:.0} deg", check.deviation))
    } else {
        Some(format!("tilt down {:.0} deg", -check.deviation))
    }
}

/// Roll adjustment hint toward a level device.
pub fn roll_hint(check: &AxisCheck) -> Option<String> {
    if check.correct {
        None
    } else if check.deviation > 0.0 {
        Some(format!("roll right {:.0} deg", check.deviation))
    } else {
        Some(format!("roll left {:.0} deg", -check.deviation))
    }
}

fn axis_line(label: &str, check: &AxisCheck, hint: Option<String>) -> String {
    match hint {
        Some(hint) => format!(
            "  {label}: {hint} ({:.0}% there)",
            check.progress * 100.0
        ),
        None => format!("  {label}: ok"),
    }
}

/// Multi-line status block for one snapshot.
pub fn render(snapshot: &GuidanceSnapshot) -> String {
    let mut lines = vec![format!("Mode: {}", mode_title(snapshot.mode))];

    match snapshot.location {
        Some(loc) => lines.push(format!("Location: {:.4}, {:.4}", loc.latitude, loc.longitude)),
        None => lines.push("Location: no fix yet".to_string()),
    }

    match &snapshot.target {
        Some(target) => {
            let mut line = format!("Target: bearing {:.2} deg true", target.target_true_azimuth);
            if let Some(magnetic) = target.target_magnetic_azimuth {
                line.push_str(&format!(" ({magnetic:.2} deg magnetic)"));
            }
            line.push_str(&format!(", tilt {:.2} deg", target.target_tilt));
            lines.push(line);
        }
        None => lines.push("Target: waiting for a location fix".to_string()),
    }

    lines.push(format!(
        "Device: azimuth {:.2} deg, pitch {:.2} deg, roll {:.2} deg",
        snapshot.attitude.azimuth, snapshot.attitude.pitch, snapshot.attitude.roll
    ));

    if let Some(verdict) = &snapshot.verdict {
        lines.push(format!(
            "Hold the device flat on the panel, back toward bearing {:.2} deg",
            verdict.device_target_azimuth
        ));
        lines.push(axis_line(
            "bearing",
            &verdict.azimuth,
            azimuth_hint(&verdict.azimuth),
        ));
        lines.push(axis_line("tilt", &verdict.tilt, tilt_hint(&verdict.tilt)));
        lines.push(axis_line("roll", &verdict.roll, roll_hint(&verdict.roll)));
        if verdict.aligned {
            lines.push("Panel aligned ✅".to_string());
        }
    }

    lines.join("\n")
}

/// Interval between sensor polls while the overlay is running.
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Status line shown when no provider reported either temperature.
pub const NO_SENSORS_HINT: &str = "No CPU/GPU temperature sensors found.";

/// One round of readings from whatever temperature provider is wired in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperatureSnapshot {
    pub cpu: Option<f32>,
    pub gpu: Option<f32>,
    /// Provider-level failure. A non-empty error replaces the temperature
    /// lines entirely.
    pub error: Option<String>,
}

/// Source of temperature readings. The overlay polls this on a fixed
/// cadence and renders whatever comes back; acquisition itself lives
/// behind this seam.
pub trait SensorSource {
    fn read(&mut self) -> TemperatureSnapshot;
}

/// Placeholder source for builds without a wired provider. Reports no
/// readings, which surfaces the hint line on the overlay.
#[derive(Debug, Default)]
pub struct UnavailableSensors;

impl SensorSource for UnavailableSensors {
    fn read(&mut self) -> TemperatureSnapshot {
        TemperatureSnapshot::default()
    }
}

/// Text content of one overlay frame, derived from a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingLines {
    pub cpu: Option<String>,
    pub gpu: Option<String>,
    pub status: Option<String>,
}

impl ReadingLines {
    pub fn from_snapshot(snapshot: &TemperatureSnapshot) -> Self {
        if let Some(error) = snapshot
            .error
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            return Self {
                cpu: None,
                gpu: None,
                status: Some(format!("Error: {error}")),
            };
        }
        let status = if snapshot.cpu.is_none() && snapshot.gpu.is_none() {
            Some(NO_SENSORS_HINT.to_string())
        } else {
            None
        };
        Self {
            cpu: Some(format_temp("CPU", snapshot.cpu)),
            gpu: Some(format_temp("GPU", snapshot.gpu)),
            status,
        }
    }
}

/// Format one temperature line. The value field is right-aligned to a
/// fixed five characters so the overlay width stays stable as readings
/// move between single, double and triple digits.
pub fn format_temp(label: &str, value: Option<f32>) -> String {
    match value {
        Some(value) => format!("{label}: {value:>5.1} C"),
        None => format!("{label}: {:>5} C", "--.-"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_field_is_five_chars_wide() {
        assert_eq!(format_temp("CPU", Some(7.5)), "CPU:   7.5 C");
        assert_eq!(format_temp("CPU", Some(43.5)), "CPU:  43.5 C");
        assert_eq!(format_temp("GPU", Some(100.0)), "GPU: 100.0 C");
        assert_eq!(format_temp("GPU", None), "GPU:  --.- C");
    }

    #[test]
    fn equal_length_for_any_realistic_reading() {
        let lines = [
            format_temp("CPU", Some(7.5)),
            format_temp("CPU", Some(43.53)),
            format_temp("CPU", Some(100.0)),
            format_temp("CPU", None),
        ];
        for line in &lines {
            assert_eq!(line.len(), lines[0].len());
        }
    }

    #[test]
    fn error_replaces_both_lines() {
        let snapshot = TemperatureSnapshot {
            cpu: Some(55.0),
            gpu: None,
            error: Some("sensor bus unavailable".into()),
        };
        let lines = ReadingLines::from_snapshot(&snapshot);
        assert_eq!(lines.cpu, None);
        assert_eq!(lines.gpu, None);
        assert_eq!(lines.status.as_deref(), Some("Error: sensor bus unavailable"));
    }

    #[test]
    fn blank_error_is_ignored() {
        let snapshot = TemperatureSnapshot {
            cpu: Some(55.0),
            gpu: Some(60.0),
            error: Some("   ".into()),
        };
        let lines = ReadingLines::from_snapshot(&snapshot);
        assert_eq!(lines.cpu.as_deref(), Some("CPU:  55.0 C"));
        assert_eq!(lines.status, None);
    }

    #[test]
    fn missing_sensors_add_hint_line() {
        let lines = ReadingLines::from_snapshot(&TemperatureSnapshot::default());
        assert_eq!(lines.cpu.as_deref(), Some("CPU:  --.- C"));
        assert_eq!(lines.gpu.as_deref(), Some("GPU:  --.- C"));
        assert_eq!(lines.status.as_deref(), Some(NO_SENSORS_HINT));
    }
}

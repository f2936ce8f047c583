use std::{
    fmt::{Display, Formatter, Result},
    time::Duration,
};

use jiff::Timestamp;

use crate::config::{ConfigError, ConfigFile};

/// Expected time until every message is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unknown,
    Estimated(Duration),
}

impl Display for Remaining {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Estimated(duration) => f.write_str(&format_duration(*duration)),
        }
    }
}

/// Share of processed messages in percent, rounded to one decimal. An empty export counts as
/// not started.
pub fn percentage(current: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[expect(clippy::cast_precision_loss)]
    let ratio = current.min(total) as f64 / total as f64;

    (ratio * 1000.0).round() / 10.0
}

/// Linear extrapolation of the elapsed time per imported message.
pub fn estimate(imported: usize, total: usize, elapsed: Duration) -> Remaining {
    if imported == 0 {
        return Remaining::Unknown;
    }
    let left = u32::try_from(total.saturating_sub(imported)).unwrap_or(u32::MAX);
    let per_message = elapsed / u32::try_from(imported).unwrap_or(u32::MAX);

    let remaining = per_message.checked_mul(left).unwrap_or(Duration::MAX);

    Remaining::Estimated(Duration::from_secs(remaining.as_secs()))
}

/// `HH:MM:SS`, hours are not wrapped.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();

    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Persists the current percentage into the run state and returns it.
pub fn update_progress(
    config: &mut ConfigFile,
    current: usize,
    total: usize,
) -> std::result::Result<f64, ConfigError> {
    let progress = percentage(current, total);
    config.update_run(|run| run.progress = progress)?;

    Ok(progress)
}

/// Estimates the remaining time from the recorded start of the run and persists the estimate.
pub fn estimate_remaining(
    config: &mut ConfigFile,
    imported: usize,
    total: usize,
    now: Timestamp,
) -> std::result::Result<Remaining, ConfigError> {
    let remaining = match config.run().start_time {
        Some(start) => {
            let elapsed = u64::try_from(now.as_second().saturating_sub(start)).unwrap_or_default();
            estimate(imported, total, Duration::from_secs(elapsed))
        }
        None => Remaining::Unknown,
    };
    config.update_run(|run| {
        run.remaining = match remaining {
            Remaining::Unknown => None,
            Remaining::Estimated(duration) => Some(format_duration(duration)),
        };
    })?;

    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use proptest::prelude::*;
    use rstest::*;
    use tempfile::{TempDir, tempdir};

    use super::*;

    #[fixture]
    fn config() -> (TempDir, ConfigFile) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("work.toml");
        fs::write(
            &path,
            "address = \"me@example.com\"\nsource = \"test\"\nsink = \"test\"\narchives_dir = \"/tmp\"\ntmp_dir = \"/tmp\"\n",
        )
        .unwrap();
        let config = ConfigFile::load(path).unwrap();
        (dir, config)
    }

    #[rstest]
    #[case(0, 0, "0.0")]
    #[case(0, 3, "0.0")]
    #[case(1, 3, "33.3")]
    #[case(2, 3, "66.7")]
    #[case(3, 3, "100.0")]
    #[case(5, 3, "100.0")]
    fn test_percentage(#[case] current: usize, #[case] total: usize, #[case] expected: &str) {
        assert_eq!(format!("{:.1}", percentage(current, total)), expected);
    }

    #[rstest]
    fn test_update_progress_persists(config: (TempDir, ConfigFile)) {
        let (_dir, mut config) = config;

        let progress = update_progress(&mut config, 1, 4).unwrap();

        let reloaded = ConfigFile::load(config.path()).unwrap();
        assert_eq!(format!("{progress:.1}"), "25.0");
        assert_eq!(reloaded.run(), config.run());
    }

    #[test]
    fn test_estimate_extrapolates_linearly() {
        assert_eq!(
            estimate(2, 10, Duration::from_secs(30)),
            Remaining::Estimated(Duration::from_secs(120))
        );
        assert_eq!(
            estimate(10, 10, Duration::from_secs(30)),
            Remaining::Estimated(Duration::ZERO)
        );
        assert_eq!(estimate(0, 10, Duration::from_secs(30)), Remaining::Unknown);
    }

    #[rstest]
    fn test_estimate_remaining_without_start_is_unknown(config: (TempDir, ConfigFile)) {
        let (_dir, mut config) = config;

        let remaining = estimate_remaining(&mut config, 3, 10, Timestamp::now()).unwrap();

        assert_eq!(remaining, Remaining::Unknown);
        assert_eq!(remaining.to_string(), "unknown");
    }

    #[rstest]
    fn test_estimate_remaining_uses_recorded_start(config: (TempDir, ConfigFile)) {
        let (_dir, mut config) = config;
        let now = Timestamp::from_second(1_700_000_100).unwrap();
        config
            .update_run(|run| run.start_time = Some(1_700_000_000))
            .unwrap();

        let remaining = estimate_remaining(&mut config, 1, 3, now).unwrap();

        assert_eq!(remaining.to_string(), "00:03:20");
        let reloaded = ConfigFile::load(config.path()).unwrap();
        assert_eq!(reloaded.run().remaining.as_deref(), Some("00:03:20"));
    }

    #[rstest]
    #[case(0, "00:00:00")]
    #[case(59, "00:00:59")]
    #[case(3661, "01:01:01")]
    #[case(100 * 3600, "100:00:00")]
    fn test_format_duration(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(seconds)), expected);
    }

    proptest! {
        #[test]
        fn percentage_is_bounded_and_monotonic(total in 1usize..10_000, a in 0usize..10_000, b in 0usize..10_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(percentage(low, total) <= percentage(high, total));
            prop_assert!((0.0..=100.0).contains(&percentage(high, total)));
        }
    }
}

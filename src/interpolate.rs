//! Projection of the displayed count between authoritative samples.

use crate::history::Sample;

const LAST_UPDATED_PREFIX: &str = "Last updated: ";

/// Linear projection from the last sample using the per-minute rate.
pub fn interpolated_count(latest: &Sample, per_minute_rate: f64, elapsed_secs: f64) -> u64 {
    let projected = latest.count as f64 + (per_minute_rate / 60.0) * elapsed_secs;
    projected.round().max(0.0) as u64
}

/// Share of `target` reached, clamped to 100.
pub fn progress_percentage(count: u64, target: u64) -> f64 {
    if target == 0 {
        return 100.0;
    }
    (count as f64 / target as f64 * 100.0).min(100.0)
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

pub fn format_time_ago(elapsed_secs: f64) -> String {
    let secs = elapsed_secs.max(0.0).floor() as u64;
    if secs < 60 {
        format!("{secs} seconds ago")
    } else if secs < 3600 {
        let minutes = secs / 60;
        format!("{minutes} minute{} ago", plural(minutes))
    } else {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        format!(
            "{hours} hour{} {minutes} minute{} ago",
            plural(hours),
            plural(minutes)
        )
    }
}

/// Puts `ago` in parentheses after the original "Last updated" timestamp.
///
/// Repeated calls replace the parenthesised part instead of stacking it.
/// Text without the prefix (e.g. before the first sample) is returned as is.
pub fn splice_time_ago(text: &str, ago: &str) -> String {
    let Some(rest) = text.split_once(LAST_UPDATED_PREFIX).map(|(_, rest)| rest) else {
        return text.to_string();
    };
    let original = rest.split_once(" (").map_or(rest, |(ts, _)| ts);
    format!("{LAST_UPDATED_PREFIX}{original} ({ago})")
}

pub fn last_updated_text(formatted_time: &str) -> String {
    format!("{LAST_UPDATED_PREFIX}{formatted_time}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_count_forward_by_rate() {
        let latest = Sample {
            count: 500_000,
            timestamp: 1_000.0,
        };
        assert_eq!(interpolated_count(&latest, 120.0, 30.0), 500_060);
        assert_eq!(interpolated_count(&latest, 120.0, 0.0), 500_000);
        // 45/60 * 1s = 0.75 rounds up
        assert_eq!(interpolated_count(&latest, 45.0, 1.0), 500_001);
    }

    #[test]
    fn projection_is_monotonic_for_non_negative_rate() {
        let latest = Sample {
            count: 10,
            timestamp: 0.0,
        };
        let mut previous = 0;
        for step in 0..120 {
            let shown = interpolated_count(&latest, 37.5, step as f64 * 0.5);
            assert!(shown >= previous);
            previous = shown;
        }
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress_percentage(2_000_000, 1_000_000), 100.0);
        assert!((progress_percentage(500_060, 1_000_000) - 50.006).abs() < 1e-9);
        assert_eq!(progress_percentage(0, 1_000_000), 0.0);
    }

    #[test]
    fn time_ago_bands() {
        assert_eq!(format_time_ago(45.0), "45 seconds ago");
        assert_eq!(format_time_ago(45.9), "45 seconds ago");
        assert_eq!(format_time_ago(60.0), "1 minute ago");
        assert_eq!(format_time_ago(125.0), "2 minutes ago");
        assert_eq!(format_time_ago(3725.0), "1 hour 2 minutes ago");
        assert_eq!(format_time_ago(7260.0), "2 hours 1 minute ago");
        assert_eq!(format_time_ago(-3.0), "0 seconds ago");
    }

    #[test]
    fn splice_keeps_original_timestamp() {
        let base = last_updated_text("14:03:27");
        let once = splice_time_ago(&base, "5 seconds ago");
        assert_eq!(once, "Last updated: 14:03:27 (5 seconds ago)");
        let twice = splice_time_ago(&once, "6 seconds ago");
        assert_eq!(twice, "Last updated: 14:03:27 (6 seconds ago)");
        assert_eq!(splice_time_ago(&twice, "6 seconds ago"), twice);
    }

    #[test]
    fn splice_leaves_unrelated_text_alone() {
        assert_eq!(splice_time_ago("Waiting for data...", "1 minute ago"), "Waiting for data...");
    }
}

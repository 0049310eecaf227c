use serde::Deserialize;

/// Payload of the signatures endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignatureReport {
    pub count: u64,
    #[serde(default)]
    pub per_minute_rate: f64,
    #[serde(default)]
    pub per_hour_rate: f64,
    /// When the backend last scraped the count; drives interpolation and scheduling
    #[serde(default)]
    pub last_fetch_time: Option<f64>,
    pub timestamp: f64,
    #[serde(default)]
    pub estimated_completion_date: Option<String>,
    #[serde(default)]
    pub progress_percentage: f64,
}

impl SignatureReport {
    pub fn server_fetch_time(&self) -> f64 {
        self.last_fetch_time.unwrap_or(self.timestamp)
    }
}

/// Payload of the plot endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotSeries {
    pub time_labels: Vec<String>,
    pub new_signatures: Vec<f64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,
}

impl PlotSeries {
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.new_signatures
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect()
    }

    pub fn max_value(&self) -> f64 {
        self.new_signatures.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_falls_back_to_timestamp_without_fetch_time() {
        let report: SignatureReport = serde_json::from_str(
            r#"{"count": 12, "timestamp": 1700000000.5, "progress_percentage": 0.0012}"#,
        )
        .unwrap();
        assert_eq!(report.server_fetch_time(), 1700000000.5);
        assert_eq!(report.per_minute_rate, 0.0);
        assert!(report.estimated_completion_date.is_none());
    }

    #[test]
    fn report_accepts_null_completion_date() {
        let report: SignatureReport = serde_json::from_str(
            r#"{"count": 500000, "per_minute_rate": 120.0, "per_hour_rate": 7200.0,
                "last_fetch_time": 1700000000.0, "timestamp": 1700000000.0,
                "formatted_time": "2023-11-14 22:13:20",
                "estimated_completion_date": null, "progress_percentage": 50.0}"#,
        )
        .unwrap();
        assert_eq!(report.count, 500_000);
        assert_eq!(report.server_fetch_time(), 1_700_000_000.0);
        assert!(report.estimated_completion_date.is_none());
    }

    #[test]
    fn plot_points_index_by_position() {
        let series = PlotSeries {
            time_labels: vec!["10:00:00".into(), "10:05:00".into()],
            new_signatures: vec![40.0, 75.0],
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
        };
        assert_eq!(series.points(), vec![(0.0, 40.0), (1.0, 75.0)]);
        assert_eq!(series.max_value(), 75.0);
    }
}

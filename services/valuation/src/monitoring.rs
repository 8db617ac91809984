use std::path::Path;

use anyhow::{Context, Result};
use modelops::{load_metrics, metrics_history, MetricsRecord};
use serde::{Deserialize, Serialize};

use crate::access_log::{read_entries, AccessLogEntry};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiUsage {
    pub total_calls: usize,
    /// Mean request duration in seconds, 0 when there are no calls.
    pub average_duration: f64,
    /// Requests that did not answer 200.
    pub error_count: usize,
}

pub fn usage(entries: &[AccessLogEntry]) -> ApiUsage {
    let total_calls = entries.len();
    let average_duration = if total_calls == 0 {
        0.0
    } else {
        entries.iter().map(|e| e.duration).sum::<f64>() / total_calls as f64
    };
    ApiUsage {
        total_calls,
        average_duration,
        error_count: entries.iter().filter(|e| e.status_code != 200).count(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelHistoryEntry {
    pub artifact: String,
    #[serde(flatten)]
    pub metrics: MetricsRecord,
}

/// Every trained artifact with its metrics, newest first.
pub fn model_history(metrics_file: &Path) -> modelops::Result<Vec<ModelHistoryEntry>> {
    let all = load_metrics(metrics_file)?;
    Ok(metrics_history(&all)
        .into_iter()
        .map(|(artifact, metrics)| ModelHistoryEntry {
            artifact: artifact.to_string(),
            metrics: metrics.clone(),
        })
        .collect())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitoringReport {
    #[serde(flatten)]
    pub usage: ApiUsage,
    pub model_history: Vec<ModelHistoryEntry>,
}

pub fn report(access_log: &Path, metrics_file: &Path) -> Result<MonitoringReport> {
    let entries = read_entries(access_log)
        .with_context(|| format!("Failed to read access log {}", access_log.display()))?;
    let model_history = model_history(metrics_file)
        .with_context(|| format!("Failed to read metrics {}", metrics_file.display()))?;
    Ok(MonitoringReport {
        usage: usage(&entries),
        model_history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::append_entry;
    use modelops::save_metrics;

    fn entry(status_code: u16, duration: f64) -> AccessLogEntry {
        AccessLogEntry {
            timestamp: "2024-05-01T12:00:00+00:00".into(),
            endpoint: "/predict".into(),
            method: "POST".into(),
            status_code,
            duration,
            error: None,
        }
    }

    #[test]
    fn test_usage() {
        assert_eq!(usage(&[]), ApiUsage { total_calls: 0, average_duration: 0.0, error_count: 0 });

        let u = usage(&[entry(200, 0.1), entry(401, 0.3), entry(500, 0.2)]);
        assert_eq!(u.total_calls, 3);
        assert_eq!(u.error_count, 2);
        assert!((u.average_duration - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_report_orders_history_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("api_logs.json");
        let metrics = dir.path().join("model_metrics.json");

        append_entry(&log, &entry(200, 0.5)).unwrap();
        let rec = |ts: &str| MetricsRecord { rmse: 1.0, mape: 0.1, mae: 0.5, timestamp: ts.into() };
        for (name, ts) in [
            ("property_friends_v1.bin", "2024-01-01T00:00:00+00:00"),
            ("property_friends_v2.bin", "2024-03-01T00:00:00+00:00"),
        ] {
            save_metrics(&metrics, name, &rec(ts)).unwrap();
        }

        let r = report(&log, &metrics).unwrap();
        assert_eq!(r.usage.total_calls, 1);
        let names: Vec<&str> = r.model_history.iter().map(|h| h.artifact.as_str()).collect();
        assert_eq!(names, ["property_friends_v2.bin", "property_friends_v1.bin"]);

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["total_calls"], 1);
        assert_eq!(json["model_history"][0]["RMSE"], 1.0);
    }
}

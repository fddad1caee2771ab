//! Pure derivation of dashboard views from raw services and logs
//!
//! Nothing in this module performs I/O or holds mutable state; every
//! function maps fetched data to derived values and is recomputed from
//! scratch each sync cycle.

use crate::models::{LogEntry, Service, TaggedLog};
use chrono::{DateTime, Utc};
use std::fmt;

/// Sentinel shown when a value is undefined because no data exists.
pub const SENTINEL: &str = "--";

/// Floor applied to normalized chart bars so they stay visually non-zero.
const CHART_BAR_FLOOR: u16 = 20;

/// Number of latency samples feeding the sparkline.
const CHART_SAMPLE_SIZE: usize = 12;

const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthLabel {
    Healthy,
    Degraded,
    Incident,
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthLabel::Healthy => write!(f, "Healthy"),
            HealthLabel::Degraded => write!(f, "Degraded"),
            HealthLabel::Incident => write!(f, "Incident"),
        }
    }
}

/// Per-service row of the health table
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceView {
    pub service_id: i64,
    pub name: String,
    pub url: String,
    pub label: HealthLabel,
    pub latency: String,
    pub uptime: String,
}

/// One alert per non-healthy service
#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub service_name: String,
    pub label: HealthLabel,
    pub message: String,
}

/// Aggregate stat-card values for the current snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct StatCards {
    pub uptime: String,
    pub avg_latency_ms: i64,
    pub incidents: usize,
    pub checks_last_hour: usize,
}

impl StatCards {
    /// Sentinel values for an empty log set.
    pub fn empty() -> Self {
        Self {
            uptime: SENTINEL.to_string(),
            avg_latency_ms: 0,
            incidents: 0,
            checks_last_hour: 0,
        }
    }
}

/// Health label precedence: inactive beats everything, then missing
/// history, then the most recent check outcome.
pub fn health_label(service: &Service, most_recent: Option<&LogEntry>) -> HealthLabel {
    if !service.is_active {
        return HealthLabel::Degraded;
    }

    let Some(log) = most_recent else {
        return HealthLabel::Degraded;
    };

    if !log.is_success || log.status_code >= 500 {
        return HealthLabel::Incident;
    }

    if log.status_code >= 400 {
        return HealthLabel::Degraded;
    }

    HealthLabel::Healthy
}

/// Success ratio over a service's own logs, two-decimal percent.
pub fn service_uptime(logs: &[LogEntry]) -> String {
    uptime_percent(logs.iter().filter(|log| log.is_success).count(), logs.len())
}

fn uptime_percent(successes: usize, total: usize) -> String {
    if total == 0 {
        return SENTINEL.to_string();
    }
    format!("{:.2}%", successes as f64 / total as f64 * 100.0)
}

/// Derive the health-table row for one service from its own recent logs,
/// which must already be sorted by `created_at` descending.
pub fn service_view(service: &Service, logs: &[LogEntry]) -> ServiceView {
    let most_recent = logs.first();
    let latency = most_recent
        .and_then(LogEntry::measured_latency)
        .map(|ms| format!("{} ms", ms))
        .unwrap_or_else(|| SENTINEL.to_string());

    ServiceView {
        service_id: service.id,
        name: service.name.clone(),
        url: service.url.clone(),
        label: health_label(service, most_recent),
        latency,
        uptime: service_uptime(logs),
    }
}

/// Merge per-service log pages into one collection tagged with the owning
/// service name, sorted by `created_at` descending.
pub fn merge_logs(per_service: Vec<(String, Vec<LogEntry>)>) -> Vec<TaggedLog> {
    let mut merged: Vec<TaggedLog> = per_service
        .into_iter()
        .flat_map(|(service_name, logs)| {
            logs.into_iter().map(move |entry| TaggedLog {
                service_name: service_name.clone(),
                entry,
            })
        })
        .collect();

    merged.sort_by(|a, b| b.entry.created_at.cmp(&a.entry.created_at));
    merged
}

/// Normalized sparkline heights from the most recent measured latencies.
///
/// Falls back to the static series when no sample has a measurement.
pub fn chart_bars(merged: &[TaggedLog], fallback: &[u16]) -> Vec<u16> {
    let sample: Vec<i64> = merged
        .iter()
        .filter_map(|log| log.entry.measured_latency())
        .take(CHART_SAMPLE_SIZE)
        .collect();

    let Some(max) = sample.iter().max().copied() else {
        return fallback.to_vec();
    };

    sample
        .iter()
        .map(|value| {
            let scaled = (*value as f64 / max as f64 * 100.0).round() as u16;
            scaled.max(CHART_BAR_FLOOR)
        })
        .collect()
}

/// Aggregate stat cards over the merged collection.
///
/// `now` is captured once per cycle by the caller so every comparison in
/// one derivation pass sees the same instant.
pub fn aggregate_stats(
    merged: &[TaggedLog],
    views: &[ServiceView],
    now: DateTime<Utc>,
) -> StatCards {
    let successes = merged.iter().filter(|log| log.entry.is_success).count();

    let latencies: Vec<i64> = merged
        .iter()
        .filter_map(|log| log.entry.measured_latency())
        .collect();
    let avg_latency_ms = if latencies.is_empty() {
        0
    } else {
        (latencies.iter().sum::<i64>() as f64 / latencies.len() as f64).round() as i64
    };

    let incidents = views
        .iter()
        .filter(|view| view.label == HealthLabel::Incident)
        .count();

    let checks_last_hour = merged
        .iter()
        .filter(|log| {
            let age = now.signed_duration_since(log.entry.created_at).num_seconds();
            (0..=SECONDS_PER_HOUR).contains(&age)
        })
        .count();

    StatCards {
        uptime: uptime_percent(successes, merged.len()),
        avg_latency_ms,
        incidents,
        checks_last_hour,
    }
}

/// One alert per service that is not healthy.
pub fn alerts(views: &[ServiceView]) -> Vec<Alert> {
    views
        .iter()
        .filter(|view| view.label != HealthLabel::Healthy)
        .map(|view| Alert {
            service_name: view.name.clone(),
            label: view.label,
            message: format!("{} status detected for {}", view.label, view.name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn service(is_active: bool) -> Service {
        Service {
            id: 4,
            project_id: 1,
            name: "Auth Gateway".to_string(),
            url: "https://api.example.com/auth/health".to_string(),
            method: "GET".to_string(),
            is_active,
            created_at: Utc::now(),
        }
    }

    fn log_at(created_at: DateTime<Utc>, status_code: u16, is_success: bool, latency: Option<i64>) -> LogEntry {
        LogEntry {
            id: 1,
            service_id: 4,
            status_code,
            response_time_ms: latency,
            is_success,
            message: None,
            created_at,
        }
    }

    fn log(status_code: u16, is_success: bool, latency: Option<i64>) -> LogEntry {
        log_at(Utc::now(), status_code, is_success, latency)
    }

    #[test]
    fn test_health_label_precedence() {
        let ok = log(200, true, Some(150));
        let client_err = log(404, true, None);
        let server_err = log(503, false, None);

        // inactive wins regardless of log content
        assert_eq!(health_label(&service(false), Some(&ok)), HealthLabel::Degraded);
        assert_eq!(health_label(&service(false), None), HealthLabel::Degraded);

        assert_eq!(health_label(&service(true), None), HealthLabel::Degraded);
        assert_eq!(health_label(&service(true), Some(&server_err)), HealthLabel::Incident);
        assert_eq!(health_label(&service(true), Some(&client_err)), HealthLabel::Degraded);
        assert_eq!(health_label(&service(true), Some(&ok)), HealthLabel::Healthy);
    }

    #[test]
    fn test_failed_check_with_2xx_status_is_an_incident() {
        let failed = log(200, false, None);
        assert_eq!(health_label(&service(true), Some(&failed)), HealthLabel::Incident);
    }

    #[test]
    fn test_service_uptime_sentinel_and_format() {
        assert_eq!(service_uptime(&[]), "--");
        assert_eq!(service_uptime(&[log(200, true, None)]), "100.00%");

        let mixed = vec![
            log(200, true, None),
            log(200, true, None),
            log(500, false, None),
        ];
        assert_eq!(service_uptime(&mixed), "66.67%");
    }

    #[test]
    fn test_single_healthy_log_scenario() {
        let svc = service(true);
        let logs = vec![log(200, true, Some(150))];
        let view = service_view(&svc, &logs);

        assert_eq!(view.label, HealthLabel::Healthy);
        assert_eq!(view.uptime, "100.00%");
        assert_eq!(view.latency, "150 ms");

        let merged = merge_logs(vec![(svc.name.clone(), logs)]);
        let stats = aggregate_stats(&merged, &[view], Utc::now());
        assert_eq!(stats.avg_latency_ms, 150);
        assert_eq!(stats.uptime, "100.00%");
    }

    #[test]
    fn test_incident_scenario_generates_alert() {
        let svc = service(true);
        let logs = vec![log(503, false, None)];
        let view = service_view(&svc, &logs);
        assert_eq!(view.label, HealthLabel::Incident);
        assert_eq!(view.latency, "--");

        let alerts = alerts(&[view]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].label, HealthLabel::Incident);
        assert_eq!(alerts[0].message, "Incident status detected for Auth Gateway");
    }

    #[test]
    fn test_healthy_services_raise_no_alerts() {
        let svc = service(true);
        let view = service_view(&svc, &[log(200, true, Some(90))]);
        assert!(alerts(&[view]).is_empty());
    }

    #[test]
    fn test_merge_logs_sorted_descending() {
        let now = Utc::now();
        let merged = merge_logs(vec![
            (
                "Auth Gateway".to_string(),
                vec![
                    log_at(now - Duration::minutes(4), 200, true, Some(148)),
                    log_at(now - Duration::minutes(30), 200, true, Some(130)),
                ],
            ),
            (
                "Payments Core".to_string(),
                vec![log_at(now - Duration::minutes(2), 502, false, Some(1202))],
            ),
        ]);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].service_name, "Payments Core");
        assert!(merged
            .windows(2)
            .all(|pair| pair[0].entry.created_at >= pair[1].entry.created_at));
    }

    #[test]
    fn test_chart_bars_fallback_when_no_measurements() {
        let fallback = crate::config::DEFAULT_CHART_SERIES.to_vec();
        let merged = merge_logs(vec![(
            "Auth Gateway".to_string(),
            vec![log(503, false, None)],
        )]);

        assert_eq!(chart_bars(&merged, &fallback), fallback);
        assert_eq!(chart_bars(&[], &fallback), fallback);
    }

    #[test]
    fn test_chart_bars_normalization_and_floor() {
        let now = Utc::now();
        let merged = merge_logs(vec![(
            "Auth Gateway".to_string(),
            vec![
                log_at(now, 200, true, Some(1000)),
                log_at(now - Duration::minutes(1), 200, true, Some(500)),
                log_at(now - Duration::minutes(2), 200, true, Some(50)),
            ],
        )]);

        let bars = chart_bars(&merged, &crate::config::DEFAULT_CHART_SERIES);
        // max sample maps to 100, half to 50, tiny values hit the floor
        assert_eq!(bars, vec![100, 50, 20]);
    }

    #[test]
    fn test_chart_bars_samples_at_most_twelve() {
        let now = Utc::now();
        let logs: Vec<LogEntry> = (0..20)
            .map(|i| log_at(now - Duration::minutes(i), 200, true, Some(100 + i)))
            .collect();
        let merged = merge_logs(vec![("Auth Gateway".to_string(), logs)]);

        let bars = chart_bars(&merged, &crate::config::DEFAULT_CHART_SERIES);
        assert_eq!(bars.len(), 12);
    }

    #[test]
    fn test_aggregate_stats_checks_last_hour() {
        let now = Utc::now();
        let merged = merge_logs(vec![(
            "Auth Gateway".to_string(),
            vec![
                log_at(now - Duration::minutes(5), 200, true, Some(100)),
                log_at(now - Duration::minutes(59), 200, true, Some(110)),
                log_at(now - Duration::minutes(90), 200, true, Some(120)),
            ],
        )]);

        let stats = aggregate_stats(&merged, &[], now);
        assert_eq!(stats.checks_last_hour, 2);
        assert_eq!(stats.avg_latency_ms, 110);
    }

    #[test]
    fn test_aggregate_stats_empty_uses_sentinels() {
        let stats = aggregate_stats(&[], &[], Utc::now());
        assert_eq!(stats, StatCards::empty());
    }
}

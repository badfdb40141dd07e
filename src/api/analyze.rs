use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/analyze", get(get_analyze))
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    services: Vec<ServiceReport>,
}

#[derive(Debug, Serialize)]
struct ServiceReport {
    name: &'static str,
    /// Seconds, rounded to 3 decimals. `None` if the service never loaded.
    load_time: Option<f64>,
    timeout_count: u64,
    error_count: u64,
    speed_summary: Option<SpeedSummary>,
}

/// Five-number summary of observed call durations, in seconds - the data
/// behind a comparative box plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SpeedSummary {
    pub samples: usize,
    pub min: f64,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
    pub max: f64,
}

/// GET /analyze - per-service diagnostics
async fn get_analyze(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, String)> {
    if !state.manager.any_loaded() {
        return Err((StatusCode::NOT_FOUND, "No data available".to_string()));
    }

    let services = state
        .manager
        .stats()
        .into_iter()
        .map(|service| ServiceReport {
            name: service.name,
            load_time: service.load_time.map(|t| round3(t.as_secs_f64())),
            timeout_count: service.timeout_count,
            error_count: service.error_count,
            speed_summary: speed_summary(&service.speed_history),
        })
        .collect();

    Ok(Json(AnalyzeResponse { services }))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub(crate) fn speed_summary(history: &[Duration]) -> Option<SpeedSummary> {
    if history.is_empty() {
        return None;
    }

    let mut secs: Vec<f64> = history.iter().map(Duration::as_secs_f64).collect();
    secs.sort_by(|a, b| a.total_cmp(b));

    Some(SpeedSummary {
        samples: secs.len(),
        min: secs[0],
        lower_quartile: quantile(&secs, 0.25),
        median: quantile(&secs, 0.5),
        upper_quartile: quantile(&secs, 0.75),
        max: secs[secs.len() - 1],
    })
}

/// Linear-interpolation quantile over a sorted sample.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_speed_summary_empty_history() {
        assert_eq!(speed_summary(&[]), None);
    }

    #[test]
    fn test_speed_summary_single_sample() {
        let summary = speed_summary(&[Duration::from_secs(2)]).unwrap();
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.median, 2.0);
        assert_eq!(summary.max, 2.0);
    }

    #[test]
    fn test_speed_summary_quartiles() {
        let history: Vec<Duration> = [1.0_f64, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|s| Duration::from_secs_f64(*s))
            .collect();
        let summary = speed_summary(&history).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.lower_quartile, 2.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.upper_quartile, 4.0);
        assert_eq!(summary.max, 5.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.5), 2.5);
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(0.1), 0.1);
    }

    #[tokio::test]
    async fn test_analyze_before_any_load_is_not_found() {
        let state = Arc::new(crate::AppState::for_tests());
        let response = routes()
            .with_state(state)
            .oneshot(Request::builder().uri("/analyze").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

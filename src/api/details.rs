use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::models::DetailsResponse;
use crate::services::manager::ServiceManager;
use crate::services::steam::SteamApp;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/details", get(get_details))
}

#[derive(Debug, Deserialize)]
struct DetailsQuery {
    appid_or_name: String,
    #[serde(default = "default_use_cache")]
    use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

/// GET /details - aggregate every source for one app.
///
/// Only subject resolution can fail the request as a whole; once the subject
/// is known, dependent-service failures degrade single fields and the
/// response stays 200.
async fn get_details(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DetailsQuery>,
) -> Result<Json<DetailsResponse>, (StatusCode, String)> {
    // Reject instead of queueing: the scrapers behind this endpoint are
    // expensive and strictly serialized, so a queue would only grow.
    let Ok(_gate) = state.details_gate.try_lock() else {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "Server is busy".to_string()));
    };

    let query = params.appid_or_name.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Empty search".to_string()));
    }

    let app = resolve_subject(&state.manager, query).await?;

    let now = Instant::now();
    {
        let mut cache = state.cache.lock().unwrap();
        if let Some(services) = cache.get(app.appid, now) {
            if params.use_cache {
                tracing::debug!(appid = app.appid, "serving details from cache");
                return Ok(Json(DetailsResponse {
                    services: services.clone(),
                    from_cache: true,
                }));
            }
            tracing::debug!(appid = app.appid, "cache bypass requested, dropping entry");
            cache.remove(app.appid);
        }
    }

    let services = state.manager.dispatch(&app).await;
    state
        .cache
        .lock()
        .unwrap()
        .insert(app.appid, services.clone(), Instant::now());

    Ok(Json(DetailsResponse {
        services,
        from_cache: false,
    }))
}

/// Resolve the query string to the authoritative subject. Numeric input is
/// tried as an appid first and falls back to a name lookup when no app
/// matches (a game can be called "911").
async fn resolve_subject(
    manager: &ServiceManager,
    query: &str,
) -> Result<SteamApp, (StatusCode, String)> {
    if let Ok(appid) = query.parse::<u32>() {
        match manager.steam.run_task(&appid).await {
            Ok(Some(app)) => return Ok(app),
            Ok(None) => {}
            Err(err) => {
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Steam error: {err}"),
                ))
            }
        }
    }

    let appid = match manager.appid_from_name(query).await {
        Ok(Some(appid)) => appid,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "App not found".to_string())),
        Err(err) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Steam error: {err}"),
            ))
        }
    };

    match manager.steam.run_task(&appid).await {
        Ok(Some(app)) => Ok(app),
        Ok(None) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to get steam details".to_string(),
        )),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Steam error: {err}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(state: Arc<AppState>) -> Router {
        routes().with_state(state)
    }

    #[tokio::test]
    async fn test_held_gate_returns_busy_immediately() {
        let state = Arc::new(AppState::for_tests());
        let _held = state.details_gate.try_lock().unwrap();

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/details?appid_or_name=620")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_query_is_a_client_error() {
        let state = Arc::new(AppState::for_tests());

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/details?appid_or_name=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected() {
        let state = Arc::new(AppState::for_tests());

        let response = router(state)
            .oneshot(Request::builder().uri("/details").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_gate_frees_after_rejection() {
        let state = Arc::new(AppState::for_tests());
        {
            let _held = state.details_gate.try_lock().unwrap();
            let response = router(state.clone())
                .oneshot(
                    Request::builder()
                        .uri("/details?appid_or_name=620")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
        // The rejected request must not have consumed the gate
        assert!(state.details_gate.try_lock().is_ok());
    }
}

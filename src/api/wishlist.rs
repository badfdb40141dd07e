use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/wishlist", get(get_wishlist))
}

#[derive(Debug, Deserialize)]
struct WishlistQuery {
    profile_name_or_id: String,
}

/// GET /wishlist - a profile's wishlist as appids, priority order
async fn get_wishlist(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WishlistQuery>,
) -> Result<Json<Vec<u32>>, (StatusCode, String)> {
    match state.manager.wishlist(&params.profile_name_or_id).await {
        Ok(Some(appids)) => Ok(Json(appids)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            "Steam ID / Profile not found (your wishlist must be public)".to_string(),
        )),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Steam error: {err}"),
        )),
    }
}

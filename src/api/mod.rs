use axum::Router;
use std::sync::Arc;

use crate::AppState;

mod analyze;
mod details;
mod wishlist;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(details::routes())
        .merge(wishlist::routes())
        .merge(analyze::routes())
}

pub mod content;
pub mod media;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().merge(content::router()).merge(media::router())
}

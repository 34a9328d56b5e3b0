//! Request handlers for the read API

use crate::api::ApiState;
use crate::storage::{with_storage, StoredNewsItem};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// A news item as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub name: String,
    pub description: String,
    pub publication_date: String,
    pub link: String,
}

impl From<StoredNewsItem> for NewsItem {
    fn from(item: StoredNewsItem) -> Self {
        Self {
            name: item.title,
            description: item.description,
            publication_date: item.publication_date,
            link: item.source_link,
        }
    }
}

/// `GET /news/{limit}`
pub async fn latest_news(State(state): State<ApiState>, Path(limit): Path<String>) -> Response {
    let Some(limit) = parse_limit(&limit) else {
        tracing::debug!("Rejected news request with limit {:?}", limit);
        return bad_request();
    };

    match with_storage(&state.storage, move |s| s.latest_items(limit)).await {
        Ok(items) => {
            let items: Vec<NewsItem> = items.into_iter().map(NewsItem::from).collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to read news: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to read news: {}", e),
            )
                .into_response()
        }
    }
}

/// `GET /news/` without a limit
pub async fn missing_limit() -> Response {
    bad_request()
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, Json(Vec::<NewsItem>::new())).into_response()
}

/// Accepts non-negative decimal integers only
fn parse_limit(raw: &str) -> Option<usize> {
    let n: i64 = raw.parse().ok()?;
    if n < 0 {
        return None;
    }
    Some(usize::try_from(n).unwrap_or(usize::MAX))
}

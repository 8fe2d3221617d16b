use crate::api::models::Track;
use crate::error::AppError;

use crate::AppState;

const DEFAULT_LIMIT: u32 = 25;

pub async fn search(
    state: &AppState,
    query: String,
    limit: Option<u32>,
) -> Result<Vec<Track>, AppError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    state.catalog.search(&query, limit).await.inspect_err(|e| {
        state.notify("Search failed", e);
    })
}

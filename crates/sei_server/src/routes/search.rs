use axum::{
    extract::{Query, State},
    Json,
};
use sei_core::{search_all, SearchHit, SearchKind, SearchQuery};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

const MAX_SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// `investigador`, `proyecto` or `publicacion`.
    pub tipo: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub resultados: Vec<SearchHit>,
}

/// Ranked search across every directory entity.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    let kind = match params.tipo.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(tipo) => Some(
            SearchKind::from_db(tipo)
                .ok_or_else(|| AppError::BadRequest(format!("unknown search type `{tipo}`")))?,
        ),
        None => None,
    };

    let mut query = SearchQuery::new(params.q.trim());
    query.kind = kind;
    if let Some(limit) = params.limit.filter(|limit| *limit > 0) {
        query.limit = limit.min(MAX_SEARCH_LIMIT);
    }

    let text = query.text.clone();
    let hits = state.db(move |conn| Ok(search_all(conn, &query)?)).await?;
    Ok(Json(SearchResponse {
        query: text,
        total: hits.len(),
        resultados: hits,
    }))
}

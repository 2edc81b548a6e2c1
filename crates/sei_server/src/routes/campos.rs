//! Research-field browsing and landing-page rankings.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use sei_core::model::campo::{
    AreaPopular, CampoDetalle, CampoQuery, InstitucionDestacada, PanoramaCampos,
};

use super::LimitQuery;
use crate::{error::AppResult, services, state::AppState};

pub async fn areas_populares_handler(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<AreaPopular>>> {
    let areas = state
        .db(move |conn| Ok(services::campos(conn)?.areas_populares(params.limit)?))
        .await?;
    Ok(Json(areas))
}

pub async fn instituciones_destacadas_handler(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<InstitucionDestacada>>> {
    let destacadas = state
        .db(move |conn| Ok(services::campos(conn)?.instituciones_destacadas(params.limit)?))
        .await?;
    Ok(Json(destacadas))
}

pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<CampoQuery>,
) -> AppResult<Json<PanoramaCampos>> {
    let panorama = state
        .db(move |conn| Ok(services::campos(conn)?.campos(&query)?))
        .await?;
    Ok(Json(panorama))
}

pub async fn detalle_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<CampoDetalle>> {
    let detalle = state
        .db(move |conn| Ok(services::campos(conn)?.campo(&slug)?))
        .await?;
    Ok(Json(detalle))
}

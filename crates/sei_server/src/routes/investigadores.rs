//! Researcher directory and profile routes.
//!
//! The `{key}` path segment is a slug on read routes and a numeric id on
//! admin routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sei_core::model::investigador::Produccion;
use sei_core::model::publicacion::Publicacion;
use sei_core::now_epoch_ms;
use sei_core::repo::investigador_repo::InvestigadorListQuery;
use sei_core::repo::publicacion_repo::{
    PublicacionListQuery, PublicacionRepository, SqlitePublicacionRepository,
};
use sei_core::{search_investigadores, Investigador, InvestigadorUpdate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_id, LimitQuery};
use crate::{
    auth::{AdminUser, CurrentUser},
    error::{AppError, AppResult},
    services,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub institucion: Option<String>,
    pub area: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

/// Public profile with production split into lines.
#[derive(Debug, Serialize)]
pub struct Perfil {
    #[serde(flatten)]
    pub investigador: Investigador,
    pub produccion: Produccion,
}

#[derive(Debug, Serialize)]
pub struct PerfilIncompleto {
    #[serde(flatten)]
    pub investigador: Investigador,
    pub campos_faltantes: Vec<&'static str>,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<Investigador>>> {
    let query = InvestigadorListQuery {
        activo: Some(true),
        institucion: params.institucion,
        area: params.area,
        limit: params.limit,
        offset: params.offset,
    };
    let rows = state
        .db(move |conn| Ok(services::investigadores(conn)?.listar(&query)?))
        .await?;
    Ok(Json(rows))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Investigador>>> {
    let rows = state
        .db(move |conn| Ok(search_investigadores(conn, &params.q, params.limit)?))
        .await?;
    Ok(Json(rows))
}

pub async fn featured_handler(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<Investigador>>> {
    let rows = state
        .db(move |conn| Ok(services::investigadores(conn)?.featured(params.limit)?))
        .await?;
    Ok(Json(rows))
}

pub async fn incompletos_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<PerfilIncompleto>>> {
    let rows = state
        .db(move |conn| Ok(services::investigadores(conn)?.incompletos(params.limit)?))
        .await?;
    Ok(Json(
        rows.into_iter()
            .map(|investigador| PerfilIncompleto {
                campos_faltantes: investigador.campos_faltantes(),
                investigador,
            })
            .collect(),
    ))
}

pub async fn actual_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Perfil>> {
    let investigador = state
        .db(move |conn| Ok(services::investigadores(conn)?.obtener(user.investigador_id)?))
        .await?;
    Ok(Json(perfil(investigador)))
}

pub async fn update_actual_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<InvestigadorUpdate>,
) -> AppResult<Json<Perfil>> {
    let investigador = state
        .db(move |conn| {
            Ok(services::investigadores(conn)?.actualizar(user.investigador_id, update)?)
        })
        .await?;
    Ok(Json(perfil(investigador)))
}

pub async fn actividad_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let at = now_epoch_ms();
    state
        .db(move |conn| {
            Ok(services::investigadores(conn)?.registrar_actividad(user.investigador_id, at)?)
        })
        .await?;
    Ok(Json(json!({ "success": true, "ultima_actividad": at })))
}

pub async fn perfil_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Perfil>> {
    let investigador = state
        .db(move |conn| Ok(services::investigadores(conn)?.perfil_por_slug(&slug)?))
        .await?;
    Ok(Json(perfil(investigador)))
}

pub async fn relacionados_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<Investigador>>> {
    let rows = state
        .db(move |conn| Ok(services::investigadores(conn)?.relacionados(&slug, params.limit)?))
        .await?;
    Ok(Json(rows))
}

/// Publications whose author field mentions the researcher's name.
pub async fn publicaciones_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<Publicacion>>> {
    let rows = state
        .db(move |conn| {
            let investigador = services::investigadores(conn)?.perfil_por_slug(&slug)?;
            if investigador.nombre_completo.is_empty() {
                return Ok(Vec::new());
            }
            let query = PublicacionListQuery {
                autor: Some(investigador.nombre_completo),
                limit: params.limit,
                ..PublicacionListQuery::default()
            };
            Ok(SqlitePublicacionRepository::try_new(conn)?.list(&query)?)
        })
        .await?;
    Ok(Json(rows))
}

pub async fn activar_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(key): Path<String>,
) -> AppResult<Json<Investigador>> {
    let id = parse_id(&key)?;
    let investigador = state
        .db(move |conn| Ok(services::investigadores(conn)?.activar(id)?))
        .await?;
    log::info!(
        "event=investigador_activar module=server status=ok id={id} admin={}",
        admin.investigador_id
    );
    Ok(Json(investigador))
}

pub async fn desactivar_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(key): Path<String>,
) -> AppResult<Json<Investigador>> {
    let id = parse_id(&key)?;
    if id == admin.investigador_id {
        return Err(AppError::BadRequest(
            "administrators cannot deactivate their own account".to_string(),
        ));
    }
    let investigador = state
        .db(move |conn| Ok(services::investigadores(conn)?.desactivar(id)?))
        .await?;
    Ok(Json(investigador))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&key)?;
    if !user.can_manage(id) {
        return Err(AppError::Forbidden(
            "only administrators or the profile owner may delete it".to_string(),
        ));
    }
    state
        .db(move |conn| Ok(services::investigadores(conn)?.eliminar(id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn perfil(investigador: Investigador) -> Perfil {
    Perfil {
        produccion: investigador.produccion(),
        investigador,
    }
}

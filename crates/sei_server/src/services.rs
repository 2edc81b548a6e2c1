//! Per-request service construction over a borrowed connection.

use std::time::Duration;

use rusqlite::Connection;
use sei_core::auth::AuthService;
use sei_core::repo::campo_repo::SqliteCampoRepository;
use sei_core::repo::conexion_repo::SqliteConexionRepository;
use sei_core::repo::credencial_repo::SqliteCredencialRepository;
use sei_core::repo::investigador_repo::SqliteInvestigadorRepository;
use sei_core::repo::mensaje_repo::SqliteMensajeRepository;
use sei_core::repo::registro_repo::SqliteRegistroRepository;
use sei_core::repo::sesion_repo::SqliteSesionRepository;
use sei_core::service::campo_service::CampoService;
use sei_core::service::conexion_service::ConexionService;
use sei_core::service::investigador_service::InvestigadorService;
use sei_core::service::mensaje_service::MensajeService;
use sei_core::service::registro_service::RegistroService;

use crate::{error::AppResult, state::SharedNotifier};

pub type Auth<'c> = AuthService<
    SqliteInvestigadorRepository<'c>,
    SqliteCredencialRepository<'c>,
    SqliteSesionRepository<'c>,
>;
pub type Investigadores<'c> = InvestigadorService<SqliteInvestigadorRepository<'c>>;
pub type Registro<'c> = RegistroService<
    SqliteInvestigadorRepository<'c>,
    SqliteRegistroRepository<'c>,
    SqliteCredencialRepository<'c>,
    SharedNotifier,
>;
pub type Campos<'c> = CampoService<SqliteCampoRepository<'c>>;
pub type Conexiones<'c> =
    ConexionService<SqliteConexionRepository<'c>, SqliteInvestigadorRepository<'c>>;
pub type Mensajes<'c> = MensajeService<SqliteMensajeRepository<'c>, SqliteInvestigadorRepository<'c>>;

pub fn auth(conn: &Connection, ttl: Duration) -> AppResult<Auth<'_>> {
    Ok(AuthService::new(
        SqliteInvestigadorRepository::try_new(conn)?,
        SqliteCredencialRepository::try_new(conn)?,
        SqliteSesionRepository::try_new(conn)?,
    )
    .with_ttl(ttl))
}

pub fn investigadores(conn: &Connection) -> AppResult<Investigadores<'_>> {
    Ok(InvestigadorService::new(SqliteInvestigadorRepository::try_new(conn)?))
}

pub fn registro(conn: &Connection, notifier: SharedNotifier) -> AppResult<Registro<'_>> {
    Ok(RegistroService::new(
        SqliteInvestigadorRepository::try_new(conn)?,
        SqliteRegistroRepository::try_new(conn)?,
        SqliteCredencialRepository::try_new(conn)?,
        notifier,
    ))
}

pub fn conexiones(conn: &Connection) -> AppResult<Conexiones<'_>> {
    Ok(ConexionService::new(
        SqliteConexionRepository::try_new(conn)?,
        SqliteInvestigadorRepository::try_new(conn)?,
    ))
}

pub fn mensajes(conn: &Connection) -> AppResult<Mensajes<'_>> {
    Ok(MensajeService::new(
        SqliteMensajeRepository::try_new(conn)?,
        SqliteInvestigadorRepository::try_new(conn)?,
    ))
}

pub fn campos(conn: &Connection) -> AppResult<Campos<'_>> {
    Ok(CampoService::new(SqliteCampoRepository::try_new(conn)?))
}

//! Login, bearer-session resolution and logout.

use crate::auth::{
    hash_password, verify_password, AuthError, AuthResult, SessionToken, SessionUser,
    MIN_PASSWORD_CHARS,
};
use crate::model::investigador::Investigador;
use crate::model::RowId;
use crate::repo::credencial_repo::{Credencial, CredencialRepository};
use crate::repo::investigador_repo::InvestigadorRepository;
use crate::repo::sesion_repo::{Sesion, SesionRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::time::Duration;
use uuid::Uuid;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct AuthService<I, C, S>
where
    I: InvestigadorRepository,
    C: CredencialRepository,
    S: SesionRepository,
{
    investigadores: I,
    credenciales: C,
    sesiones: S,
    ttl_ms: i64,
}

impl<I, C, S> AuthService<I, C, S>
where
    I: InvestigadorRepository,
    C: CredencialRepository,
    S: SesionRepository,
{
    pub fn new(investigadores: I, credenciales: C, sesiones: S) -> Self {
        Self {
            investigadores,
            credenciales,
            sesiones,
            ttl_ms: DEFAULT_SESSION_TTL.as_millis() as i64,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self
    }

    /// Verifies credentials and issues a new session token.
    pub fn login(&self, correo: &str, password: &str, now_epoch_ms: i64) -> AuthResult<SessionToken> {
        let correo = correo.trim().to_lowercase();
        let Some(investigador) = self.investigadores.get_by_correo(&correo)? else {
            info!("event=auth_login module=auth status=rejected reason=unknown_email");
            return Err(AuthError::InvalidCredentials);
        };
        let Some(credencial) = self.credenciales.get(investigador.id)? else {
            info!(
                "event=auth_login module=auth status=rejected reason=no_password investigador_id={}",
                investigador.id
            );
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &credencial.password_hash, &credencial.password_salt) {
            warn!(
                "event=auth_login module=auth status=rejected reason=bad_password investigador_id={}",
                investigador.id
            );
            return Err(AuthError::InvalidCredentials);
        }
        if !investigador.activo {
            return Err(AuthError::InactiveAccount);
        }

        let sesion = Sesion {
            token: Uuid::new_v4().simple().to_string(),
            investigador_id: investigador.id,
            created_at: now_epoch_ms,
            expires_at: now_epoch_ms.saturating_add(self.ttl_ms),
        };
        self.sesiones.create(&sesion)?;
        self.investigadores
            .touch_actividad(investigador.id, now_epoch_ms)?;

        info!(
            "event=auth_login module=auth status=ok investigador_id={}",
            investigador.id
        );
        Ok(SessionToken {
            token: sesion.token,
            expires_at: sesion.expires_at,
            usuario: session_user(&investigador),
        })
    }

    /// Resolves a bearer token and records the caller's activity.
    pub fn resolve(&self, token: &str, now_epoch_ms: i64) -> AuthResult<SessionUser> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidSession);
        }
        let investigador_id = self
            .sesiones
            .resolve(token, now_epoch_ms)?
            .ok_or(AuthError::InvalidSession)?;
        let investigador = self
            .investigadores
            .get(investigador_id)?
            .ok_or(AuthError::InvalidSession)?;
        if !investigador.activo {
            return Err(AuthError::InactiveAccount);
        }
        self.investigadores
            .touch_actividad(investigador_id, now_epoch_ms)?;
        Ok(session_user(&investigador))
    }

    /// Revokes one token. Returns whether it existed.
    pub fn logout(&self, token: &str) -> AuthResult<bool> {
        let revoked = self.sesiones.revoke(token.trim())?;
        info!("event=auth_logout module=auth status=ok revoked={revoked}");
        Ok(revoked)
    }

    /// Replaces a researcher's password and drops their open sessions.
    pub fn set_password(&self, investigador_id: RowId, password: &str) -> AuthResult<()> {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::WeakPassword {
                min_chars: MIN_PASSWORD_CHARS,
            });
        }
        if self.investigadores.get(investigador_id)?.is_none() {
            return Err(AuthError::Repo(RepoError::not_found(
                "investigador",
                investigador_id,
            )));
        }

        let digest = hash_password(password);
        self.credenciales.upsert(&Credencial {
            investigador_id,
            password_hash: digest.hash,
            password_salt: digest.salt,
        })?;
        let revoked = self.sesiones.revoke_all(investigador_id)?;
        info!(
            "event=auth_set_password module=auth status=ok investigador_id={investigador_id} revoked_sessions={revoked}"
        );
        Ok(())
    }

    pub fn purge_expired(&self, now_epoch_ms: i64) -> AuthResult<usize> {
        Ok(self.sesiones.purge_expired(now_epoch_ms)?)
    }
}

fn session_user(investigador: &Investigador) -> SessionUser {
    SessionUser {
        investigador_id: investigador.id,
        slug: investigador.slug.clone(),
        nombre_completo: investigador.nombre_completo.clone(),
        correo: investigador.correo.clone(),
        es_admin: investigador.es_admin,
        es_evaluador: investigador.es_evaluador,
    }
}

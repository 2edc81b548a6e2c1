//! Self-service registration with an emailed verification code.
//!
//! # Responsibility
//! - Park registration requests until the applicant proves control of the
//!   email address.
//! - Turn a verified request into a profile with login credentials.
//! - Remove requests that were never completed.
//!
//! # Invariants
//! - A code is six decimal digits and expires [`CODIGO_TTL_MS`] after issue.
//! - A code can be redeemed once; redeeming removes the pending row.
//! - A redeemed code, its profile and its credential are stored atomically.
//! - Duplicate identity checks run both at request and at completion time.

use crate::auth::{hash_password, MIN_PASSWORD_CHARS};
use crate::model::investigador::{Investigador, NuevoInvestigador, Origen};
use crate::model::{RowId, ValidationError};
use crate::repo::credencial_repo::{Credencial, CredencialRepository};
use crate::repo::investigador_repo::InvestigadorRepository;
use crate::repo::registro_repo::{NuevoRegistro, RegistroRepository};
use crate::repo::RepoError;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use rand::Rng;
use serde::Serialize;

/// Lifetime of a pending registration.
pub const CODIGO_TTL_MS: i64 = 24 * 60 * 60 * 1000;
const MAX_CODE_ATTEMPTS: usize = 5;

/// Delivers verification codes to applicants.
pub trait Notifier {
    fn enviar_codigo(&self, correo: &str, nombre: &str, codigo: &str) -> Result<(), String>;
}

/// Writes the code to the application log instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn enviar_codigo(&self, correo: &str, nombre: &str, codigo: &str) -> Result<(), String> {
        info!("{}", aviso_codigo(correo, nombre, codigo));
        Ok(())
    }
}

fn aviso_codigo(correo: &str, nombre: &str, codigo: &str) -> String {
    format!(
        "event=registro_codigo module=service status=ok correo={} nombre={:?} codigo={}",
        crate::logging::mask_email(correo),
        nombre,
        codigo
    )
}

/// Acknowledgement returned once a code has been issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolicitudRegistrada {
    pub id: RowId,
    pub correo: String,
    pub expires_at: i64,
}

pub struct RegistroService<I, R, C, N>
where
    I: InvestigadorRepository,
    R: RegistroRepository,
    C: CredencialRepository,
    N: Notifier,
{
    investigadores: I,
    registros: R,
    credenciales: C,
    notifier: N,
}

impl<I, R, C, N> RegistroService<I, R, C, N>
where
    I: InvestigadorRepository,
    R: RegistroRepository,
    C: CredencialRepository,
    N: Notifier,
{
    pub fn new(investigadores: I, registros: R, credenciales: C, notifier: N) -> Self {
        Self {
            investigadores,
            registros,
            credenciales,
            notifier,
        }
    }

    /// Stores a pending registration and hands its code to the notifier.
    pub fn solicitar(
        &self,
        input: NuevoRegistro,
        now_epoch_ms: i64,
    ) -> ServiceResult<SolicitudRegistrada> {
        let candidate = as_profile(&input);
        let candidate = normalized(candidate)?;
        let correo = candidate.correo.clone().unwrap_or_default();
        if candidate.nombre_completo.is_empty() || correo.is_empty() {
            let mut missing = Vec::new();
            if candidate.nombre_completo.is_empty() {
                missing.push("nombre_completo");
            }
            if correo.is_empty() {
                missing.push("correo");
            }
            return Err(ValidationError::MissingFields(missing).into());
        }
        self.ensure_unique(&candidate)?;

        let registro = NuevoRegistro {
            nombre_completo: candidate.nombre_completo.clone(),
            correo: correo.clone(),
            curp: candidate.curp.clone(),
            rfc: candidate.rfc.clone(),
            no_cvu: candidate.no_cvu.clone(),
            telefono: candidate.telefono.clone(),
            institucion: candidate.institucion.clone(),
        };

        let mut attempt = 0;
        let (id, codigo) = loop {
            attempt += 1;
            let codigo = generar_codigo();
            match self.registros.insert(&registro, &codigo, now_epoch_ms) {
                Ok(id) => break (id, codigo),
                Err(RepoError::Duplicate { field: "codigo", .. }) if attempt < MAX_CODE_ATTEMPTS => {
                    continue
                }
                Err(err) => return Err(err.into()),
            }
        };

        self.notifier
            .enviar_codigo(&correo, &registro.nombre_completo, &codigo)
            .map_err(|message| {
                warn!(
                    "event=registro_solicitar module=service status=error reason=notifier message={}",
                    crate::logging::sanitize_message(&message, 200)
                );
                ServiceError::Notification(message)
            })?;

        info!(
            "event=registro_solicitar module=service status=ok id={id} correo={}",
            crate::logging::mask_email(&correo)
        );
        Ok(SolicitudRegistrada {
            id,
            correo,
            expires_at: now_epoch_ms + CODIGO_TTL_MS,
        })
    }

    /// Redeems a code, creating the profile and its password.
    pub fn completar(
        &self,
        codigo: &str,
        password: &str,
        now_epoch_ms: i64,
    ) -> ServiceResult<Investigador> {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::invalid(
                "password",
                format!("must have at least {MIN_PASSWORD_CHARS} characters"),
            )
            .into());
        }

        // Taking the code, creating the profile and storing its password
        // commit together. An expired code is still consumed.
        let creado = self.registros.atomically(|| -> ServiceResult<Option<RowId>> {
            let registro = self
                .registros
                .take_by_codigo(codigo.trim())?
                .ok_or(ServiceError::CodigoInvalido)?;
            if now_epoch_ms - registro.created_at > CODIGO_TTL_MS {
                info!(
                    "event=registro_completar module=service status=expired id={}",
                    registro.id
                );
                return Ok(None);
            }

            let candidate = normalized(NuevoInvestigador {
                nombre_completo: registro.nombre_completo,
                correo: Some(registro.correo),
                curp: registro.curp,
                rfc: registro.rfc,
                no_cvu: registro.no_cvu,
                telefono: registro.telefono,
                institucion: registro.institucion,
                origen: Origen::Registro,
                ..NuevoInvestigador::default()
            })?;
            self.ensure_unique(&candidate)?;

            let id = self.investigadores.create(&candidate)?;
            let digest = hash_password(password);
            self.credenciales.upsert(&Credencial {
                investigador_id: id,
                password_hash: digest.hash,
                password_salt: digest.salt,
            })?;
            Ok(Some(id))
        })?;
        let id = creado.ok_or(ServiceError::CodigoInvalido)?;

        info!("event=registro_completar module=service status=ok investigador_id={id}");
        self.investigadores
            .get(id)?
            .ok_or_else(|| ServiceError::not_found("investigador", id))
    }

    /// Deletes pending registrations older than the code lifetime.
    pub fn limpiar_expirados(&self, now_epoch_ms: i64) -> ServiceResult<usize> {
        let removed = self
            .registros
            .delete_older_than(now_epoch_ms - CODIGO_TTL_MS)?;
        info!("event=registro_limpiar module=service status=ok removed={removed}");
        Ok(removed)
    }

    fn ensure_unique(&self, candidate: &NuevoInvestigador) -> ServiceResult<()> {
        let nombre = Some(candidate.nombre_completo.as_str()).filter(|value| !value.is_empty());
        match self.investigadores.find_duplicate(
            candidate.curp.as_deref(),
            candidate.correo.as_deref(),
            nombre,
            None,
        )? {
            Some((key, existing_id)) => Err(ServiceError::Duplicate {
                field: key.field(),
                existing_id,
            }),
            None => Ok(()),
        }
    }
}

fn as_profile(input: &NuevoRegistro) -> NuevoInvestigador {
    NuevoInvestigador {
        nombre_completo: input.nombre_completo.clone(),
        correo: Some(input.correo.clone()),
        curp: input.curp.clone(),
        rfc: input.rfc.clone(),
        no_cvu: input.no_cvu.clone(),
        telefono: input.telefono.clone(),
        institucion: input.institucion.clone(),
        ..NuevoInvestigador::default()
    }
}

fn normalized(mut candidate: NuevoInvestigador) -> ServiceResult<NuevoInvestigador> {
    candidate.normalize();
    candidate.validate()?;
    Ok(candidate)
}

fn generar_codigo() -> String {
    let value: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    value.to_string()
}

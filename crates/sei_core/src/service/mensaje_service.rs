//! Direct messages between researchers.

use crate::model::mensaje::{Mensaje, MensajeVista, NuevoMensaje};
use crate::model::RowId;
use crate::repo::investigador_repo::InvestigadorRepository;
use crate::repo::mensaje_repo::MensajeRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;

pub struct MensajeService<M: MensajeRepository, I: InvestigadorRepository> {
    mensajes: M,
    investigadores: I,
}

impl<M: MensajeRepository, I: InvestigadorRepository> MensajeService<M, I> {
    pub fn new(mensajes: M, investigadores: I) -> Self {
        Self {
            mensajes,
            investigadores,
        }
    }

    pub fn enviar(&self, remitente_id: RowId, mut input: NuevoMensaje) -> ServiceResult<Mensaje> {
        input.normalize();
        input.validate()?;
        let destinatario_id = input.destinatario_id.unwrap_or_default();
        if self.investigadores.get(destinatario_id)?.is_none() {
            return Err(ServiceError::not_found("investigador", destinatario_id));
        }

        let id = self.mensajes.enviar(remitente_id, &input)?;
        info!(
            "event=mensaje_enviar module=service status=ok id={id} remitente={remitente_id} destinatario={destinatario_id}"
        );
        self.mensajes
            .get(id)?
            .ok_or_else(|| ServiceError::not_found("mensaje", id))
    }

    /// Sent and received messages, newest first.
    pub fn listar(&self, investigador_id: RowId) -> ServiceResult<Vec<MensajeVista>> {
        Ok(self.mensajes.listar(investigador_id)?)
    }

    /// Marks a received message as read. Re-marking is a no-op.
    pub fn marcar_leido(&self, mensaje_id: RowId, investigador_id: RowId) -> ServiceResult<()> {
        if self.mensajes.marcar_leido(mensaje_id, investigador_id)? {
            return Ok(());
        }
        match self.mensajes.get(mensaje_id)? {
            None => Err(ServiceError::not_found("mensaje", mensaje_id)),
            Some(_) => Err(ServiceError::Forbidden(
                "only the recipient may mark a message as read".to_string(),
            )),
        }
    }

    pub fn no_leidos(&self, investigador_id: RowId) -> ServiceResult<i64> {
        Ok(self.mensajes.no_leidos(investigador_id)?)
    }
}

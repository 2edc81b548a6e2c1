use rusqlite::Connection;
use sei_core::db::open_db_in_memory;
use sei_core::model::conexion::{AccionConexion, EstadoConexion, RazonSugerencia, TipoConexion};
use sei_core::model::investigador::NuevoInvestigador;
use sei_core::model::mensaje::{NuevoMensaje, TipoMensaje};
use sei_core::repo::conexion_repo::SqliteConexionRepository;
use sei_core::repo::investigador_repo::{InvestigadorRepository, SqliteInvestigadorRepository};
use sei_core::repo::mensaje_repo::SqliteMensajeRepository;
use sei_core::service::conexion_service::ConexionService;
use sei_core::service::mensaje_service::MensajeService;
use sei_core::{RowId, ServiceError, ValidationError};

fn seed(conn: &Connection, nombres: &[&str]) -> Vec<RowId> {
    let repo = SqliteInvestigadorRepository::try_new(conn).unwrap();
    nombres
        .iter()
        .map(|nombre| {
            repo.create(&NuevoInvestigador {
                nombre_completo: nombre.to_string(),
                institucion: Some("UACH".to_string()),
                ..NuevoInvestigador::default()
            })
            .unwrap()
        })
        .collect()
}

fn conexiones(conn: &Connection) -> ConexionService<SqliteConexionRepository<'_>, SqliteInvestigadorRepository<'_>> {
    ConexionService::new(
        SqliteConexionRepository::try_new(conn).unwrap(),
        SqliteInvestigadorRepository::try_new(conn).unwrap(),
    )
}

fn mensajes(conn: &Connection) -> MensajeService<SqliteMensajeRepository<'_>, SqliteInvestigadorRepository<'_>> {
    MensajeService::new(
        SqliteMensajeRepository::try_new(conn).unwrap(),
        SqliteInvestigadorRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn connection_request_is_unique_per_pair_in_both_directions() {
    let conn = open_db_in_memory().unwrap();
    let ids = seed(&conn, &["Ana Ruiz", "Luis Pérez"]);
    let service = conexiones(&conn);

    let created = service
        .solicitar(ids[0], ids[1], Some("  Colaboremos  "))
        .unwrap();
    assert_eq!(created.estado, EstadoConexion::Pendiente);
    assert_eq!(created.mensaje.as_deref(), Some("Colaboremos"));

    let same_direction = service.solicitar(ids[0], ids[1], None).unwrap_err();
    assert!(matches!(
        same_direction,
        ServiceError::Duplicate { field: "conexion", existing_id } if existing_id == created.id
    ));
    let reverse = service.solicitar(ids[1], ids[0], None).unwrap_err();
    assert!(matches!(reverse, ServiceError::Duplicate { .. }));
}

#[test]
fn connection_request_rejects_self_and_unknown_targets() {
    let conn = open_db_in_memory().unwrap();
    let ids = seed(&conn, &["Ana Ruiz"]);
    let service = conexiones(&conn);

    assert!(matches!(
        service.solicitar(ids[0], ids[0], None),
        Err(ServiceError::InvalidRequest(_))
    ));
    assert!(matches!(
        service.solicitar(ids[0], 9_999, None),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn only_the_destination_answers_and_only_once() {
    let conn = open_db_in_memory().unwrap();
    let ids = seed(&conn, &["Ana Ruiz", "Luis Pérez", "Marta Soto"]);
    let service = conexiones(&conn);
    let request = service.solicitar(ids[0], ids[1], None).unwrap();
    assert_eq!(service.pendientes(ids[1]).unwrap(), 1);
    assert_eq!(service.pendientes(ids[0]).unwrap(), 0);

    assert!(matches!(
        service.responder(request.id, ids[0], AccionConexion::Aceptar),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.responder(request.id, ids[2], AccionConexion::Aceptar),
        Err(ServiceError::Forbidden(_))
    ));

    let accepted = service
        .responder(request.id, ids[1], AccionConexion::Aceptar)
        .unwrap();
    assert_eq!(accepted.estado, EstadoConexion::Aceptada);
    assert!(accepted.fecha_respuesta.is_some());
    assert_eq!(service.pendientes(ids[1]).unwrap(), 0);

    assert!(matches!(
        service.responder(request.id, ids[1], AccionConexion::Rechazar),
        Err(ServiceError::InvalidRequest(_))
    ));

    let estado = service.estado_con(ids[1], ids[0]).unwrap().unwrap();
    assert_eq!(estado.id, request.id);
    assert!(service.estado_con(ids[0], ids[2]).unwrap().is_none());
}

#[test]
fn listing_shows_direction_and_other_party_with_pending_first() {
    let conn = open_db_in_memory().unwrap();
    let ids = seed(&conn, &["Ana Ruiz", "Luis Pérez", "Marta Soto"]);
    let service = conexiones(&conn);

    let sent = service.solicitar(ids[0], ids[1], None).unwrap();
    service
        .responder(sent.id, ids[1], AccionConexion::Aceptar)
        .unwrap();
    let received = service.solicitar(ids[2], ids[0], None).unwrap();

    let listed = service.listar(ids[0]).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].conexion.id, received.id);
    assert_eq!(listed[0].tipo, TipoConexion::Recibida);
    assert_eq!(listed[0].otro.nombre_completo, "Marta Soto");
    assert_eq!(listed[1].tipo, TipoConexion::Enviada);
    assert_eq!(listed[1].otro.id, ids[1]);
    assert_eq!(listed[1].otro.institucion.as_deref(), Some("UACH"));
}

#[test]
fn messages_validate_send_list_and_mark_read() {
    let conn = open_db_in_memory().unwrap();
    let ids = seed(&conn, &["Ana Ruiz", "Luis Pérez"]);
    let service = mensajes(&conn);

    let missing = service
        .enviar(
            ids[0],
            NuevoMensaje {
                destinatario_id: Some(ids[1]),
                asunto: Some("   ".to_string()),
                ..NuevoMensaje::default()
            },
        )
        .unwrap_err();
    match missing {
        ServiceError::Validation(ValidationError::MissingFields(fields)) => {
            assert_eq!(fields, vec!["asunto", "mensaje"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let too_long = service
        .enviar(
            ids[0],
            NuevoMensaje {
                destinatario_id: Some(ids[1]),
                asunto: Some("x".repeat(201)),
                mensaje: Some("hola".to_string()),
                ..NuevoMensaje::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        too_long,
        ServiceError::Validation(ValidationError::InvalidField { field: "asunto", .. })
    ));

    assert!(matches!(
        service.enviar(
            ids[0],
            NuevoMensaje {
                destinatario_id: Some(4_242),
                asunto: Some("Hola".to_string()),
                mensaje: Some("¿Colaboramos?".to_string()),
                ..NuevoMensaje::default()
            },
        ),
        Err(ServiceError::NotFound { .. })
    ));

    let sent = service
        .enviar(
            ids[0],
            NuevoMensaje {
                destinatario_id: Some(ids[1]),
                asunto: Some(" Proyecto ".to_string()),
                mensaje: Some("¿Colaboramos?".to_string()),
                ..NuevoMensaje::default()
            },
        )
        .unwrap();
    assert_eq!(sent.asunto, "Proyecto");
    assert!(!sent.leido);
    assert_eq!(service.no_leidos(ids[1]).unwrap(), 1);

    let inbox = service.listar(ids[1]).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].tipo, TipoMensaje::Recibido);
    assert_eq!(inbox[0].otro.id, ids[0]);
    let outbox = service.listar(ids[0]).unwrap();
    assert_eq!(outbox[0].tipo, TipoMensaje::Enviado);

    assert!(matches!(
        service.marcar_leido(sent.id, ids[0]),
        Err(ServiceError::Forbidden(_))
    ));
    service.marcar_leido(sent.id, ids[1]).unwrap();
    service.marcar_leido(sent.id, ids[1]).unwrap();
    assert_eq!(service.no_leidos(ids[1]).unwrap(), 0);
    assert!(matches!(
        service.marcar_leido(77_777, ids[1]),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn deleting_a_researcher_cascades_social_rows() {
    let conn = open_db_in_memory().unwrap();
    let ids = seed(&conn, &["Ana Ruiz", "Luis Pérez"]);
    conexiones(&conn).solicitar(ids[0], ids[1], None).unwrap();
    mensajes(&conn)
        .enviar(
            ids[1],
            NuevoMensaje {
                destinatario_id: Some(ids[0]),
                asunto: Some("Hola".to_string()),
                mensaje: Some("Saludos".to_string()),
                ..NuevoMensaje::default()
            },
        )
        .unwrap();

    SqliteInvestigadorRepository::try_new(&conn)
        .unwrap()
        .delete(ids[0])
        .unwrap();

    assert!(conexiones(&conn).listar(ids[1]).unwrap().is_empty());
    assert!(mensajes(&conn).listar(ids[1]).unwrap().is_empty());
}

#[test]
fn suggestions_skip_existing_contacts_and_explain_the_match() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteInvestigadorRepository::try_new(&conn).unwrap();
    let mut ids = Vec::new();
    for (nombre, area, institucion) in [
        ("Ana Ruiz", "Hidrología", "UACH"),
        ("Luis Pérez", "hidrología", "ITCJ"),
        ("Marta Soto", "Física", "UACH"),
        ("Pedro Lara", "Hidrología", "UACH"),
        ("Sofía Gil", "Química", "ITCJ"),
    ] {
        ids.push(
            repo.create(&NuevoInvestigador {
                nombre_completo: nombre.to_string(),
                area: Some(area.to_string()),
                institucion: Some(institucion.to_string()),
                ..NuevoInvestigador::default()
            })
            .unwrap(),
        );
    }
    let service = conexiones(&conn);
    service.solicitar(ids[3], ids[0], None).unwrap();

    let sugerencias = service.sugerencias(ids[0], None).unwrap();
    let vistas: Vec<_> = sugerencias
        .iter()
        .map(|sugerencia| (sugerencia.contacto.id, sugerencia.razon))
        .collect();
    assert_eq!(
        vistas,
        vec![
            (ids[1], RazonSugerencia::AreaSimilar),
            (ids[2], RazonSugerencia::MismaInstitucion),
        ]
    );

    assert_eq!(service.sugerencias(ids[0], Some(1)).unwrap().len(), 1);
    assert!(matches!(
        service.sugerencias(9_999, None),
        Err(ServiceError::NotFound { .. })
    ));
}

use chrono::NaiveDate;
use sei_core::db::open_db_in_memory;
use sei_core::model::convocatoria::{ConvocatoriaInput, EstadoConvocatoria};
use sei_core::model::institucion::InstitucionInput;
use sei_core::model::investigador::NuevoInvestigador;
use sei_core::model::proyecto::ProyectoInput;
use sei_core::model::publicacion::PublicacionInput;
use sei_core::repo::convocatoria_repo::{ConvocatoriaRepository, SqliteConvocatoriaRepository};
use sei_core::repo::institucion_repo::{InstitucionRepository, SqliteInstitucionRepository};
use sei_core::repo::investigador_repo::{InvestigadorRepository, SqliteInvestigadorRepository};
use sei_core::repo::proyecto_repo::{
    ProyectoListQuery, ProyectoRepository, SqliteProyectoRepository,
};
use sei_core::repo::publicacion_repo::{
    PublicacionListQuery, PublicacionRepository, SqlitePublicacionRepository,
};
use sei_core::service::estadisticas_service::EstadisticasService;
use sei_core::{RepoError, ValidationError};

fn proyecto(titulo: &str, categoria: &str, fecha_inicio: &str) -> ProyectoInput {
    ProyectoInput {
        titulo: Some(titulo.to_string()),
        descripcion: Some("Descripción amplia".to_string()),
        resumen: Some("Resumen breve".to_string()),
        categoria: Some(categoria.to_string()),
        autor: Some("Ana Ruiz".to_string()),
        institucion: Some("UACH".to_string()),
        fecha_inicio: Some(fecha_inicio.to_string()),
        ..ProyectoInput::default()
    }
}

fn publicacion(titulo: &str, autor: &str, editorial: Option<&str>) -> PublicacionInput {
    PublicacionInput {
        titulo: Some(titulo.to_string()),
        autor: Some(autor.to_string()),
        editorial: editorial.map(str::to_string),
        anio_creacion: Some(2022),
        ..PublicacionInput::default()
    }
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

#[test]
fn institution_counts_researchers_by_case_insensitive_name() {
    let conn = open_db_in_memory().unwrap();
    let instituciones = SqliteInstitucionRepository::try_new(&conn).unwrap();
    let investigadores = SqliteInvestigadorRepository::try_new(&conn).unwrap();

    let mut input = InstitucionInput {
        nombre: Some("Universidad Autónoma de Chihuahua".to_string()),
        siglas: Some("uach".to_string()),
        sitio_web: Some("https://uach.mx".to_string()),
        ..InstitucionInput::default()
    };
    input.normalize();
    let id = instituciones.create(&input).unwrap();

    for nombre in ["Ana Ruiz", "Luis Pérez"] {
        investigadores
            .create(&NuevoInvestigador {
                nombre_completo: nombre.to_string(),
                institucion: Some("universidad autónoma de chihuahua".to_string()),
                ..NuevoInvestigador::default()
            })
            .unwrap();
    }

    let stored = instituciones.get(id).unwrap().unwrap();
    assert_eq!(stored.institucion.siglas.as_deref(), Some("UACH"));
    assert_eq!(stored.investigadores, 2);

    let duplicate = InstitucionInput {
        nombre: Some("universidad autónoma de chihuahua".to_string()),
        ..InstitucionInput::default()
    };
    assert!(matches!(
        instituciones.create(&duplicate),
        Err(RepoError::Duplicate { field: "nombre", .. })
    ));

    instituciones
        .set_imagen_url(id, "/uploads/instituciones/uach.png")
        .unwrap();
    let listed = instituciones.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(
        listed[0].institucion.imagen_url.as_deref(),
        Some("/uploads/instituciones/uach.png")
    );

    instituciones.delete(id).unwrap();
    assert!(matches!(
        instituciones.delete(id),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn institution_requires_a_name() {
    let conn = open_db_in_memory().unwrap();
    let instituciones = SqliteInstitucionRepository::try_new(&conn).unwrap();
    assert!(matches!(
        instituciones.create(&InstitucionInput::default()),
        Err(RepoError::Validation(ValidationError::MissingFields(_)))
    ));
}

#[test]
fn project_crud_regenerates_slug_and_orders_recent_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProyectoRepository::try_new(&conn).unwrap();

    let agua = repo
        .create(&proyecto("Agua Subterránea", "Hidrología", "2023-01-10"), None)
        .unwrap();
    let suelo = repo
        .create(&proyecto("Suelos áridos", "Agronomía", "2024-03-01"), None)
        .unwrap();

    let stored = repo.get(agua).unwrap().unwrap();
    assert_eq!(
        stored.slug.as_deref(),
        Some(format!("agua-subterranea-{agua}").as_str())
    );

    let recent = repo.recent(Some(1)).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, suelo);

    let filtered = repo
        .list(&ProyectoListQuery {
            categoria: Some("hidrología".to_string()),
            ..ProyectoListQuery::default()
        })
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, agua);

    let updated = repo
        .update(agua, &proyecto("Acuíferos del norte", "Hidrología", "2023-01-10"))
        .unwrap();
    assert_eq!(
        updated.slug.as_deref(),
        Some(format!("acuiferos-del-norte-{agua}").as_str())
    );
    assert!(repo
        .get_by_slug(&format!("acuiferos-del-norte-{agua}"))
        .unwrap()
        .is_some());

    repo.delete(suelo).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn project_create_reports_every_missing_field() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProyectoRepository::try_new(&conn).unwrap();
    let err = repo
        .create(
            &ProyectoInput {
                titulo: Some("Solo título".to_string()),
                ..ProyectoInput::default()
            },
            None,
        )
        .unwrap_err();
    match err {
        RepoError::Validation(ValidationError::MissingFields(fields)) => {
            assert_eq!(fields.len(), 6);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn publications_filter_by_author_substring_and_list_journals() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePublicacionRepository::try_new(&conn).unwrap();

    repo.create(
        &publicacion("Acuíferos", "Ana Ruiz, Luis Pérez", Some("Revista Hídrica")),
        None,
    )
    .unwrap();
    repo.create(&publicacion("Suelos", "Marta Soto", Some("Agro Norte")), None)
        .unwrap();
    let third = repo
        .create(&publicacion("Sequía", "ana ruiz", Some("Revista Hídrica")), None)
        .unwrap();

    let by_author = repo
        .list(&PublicacionListQuery {
            autor: Some("ANA RUIZ".to_string()),
            ..PublicacionListQuery::default()
        })
        .unwrap();
    assert_eq!(by_author.len(), 2);

    let revistas = repo.revistas().unwrap();
    assert_eq!(revistas, vec!["Agro Norte", "Revista Hídrica"]);

    let updated = repo
        .update(third, &publicacion("Sequía extrema", "ana ruiz", None))
        .unwrap();
    assert_eq!(updated.titulo, "Sequía extrema");
    assert!(updated.editorial.is_none());
}

#[test]
fn calls_are_ordered_by_closing_date_with_derived_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteConvocatoriaRepository::try_new(&conn).unwrap();
    let hoy = date("2025-06-15");

    for (titulo, apertura, cierre) in [
        ("Futura", "2025-07-01", "2025-08-01"),
        ("Abierta", "2025-06-01", "2025-06-15"),
        ("Cerrada", "2025-01-01", "2025-02-01"),
    ] {
        repo.create(&ConvocatoriaInput {
            titulo: Some(titulo.to_string()),
            fecha_apertura: Some(apertura.to_string()),
            fecha_cierre: Some(cierre.to_string()),
            ..ConvocatoriaInput::default()
        })
        .unwrap();
    }

    let listed = repo.list().unwrap();
    let titles: Vec<_> = listed.iter().map(|c| c.titulo.as_str()).collect();
    assert_eq!(titles, vec!["Cerrada", "Abierta", "Futura"]);

    let estados: Vec<_> = listed.iter().map(|c| c.estado(hoy)).collect();
    assert_eq!(
        estados,
        vec![
            EstadoConvocatoria::Cerrada,
            EstadoConvocatoria::Abierta,
            EstadoConvocatoria::Proxima
        ]
    );
    assert_eq!(listed[1].dias_restantes(hoy), Some(0));
    assert_eq!(listed[0].dias_restantes(hoy), None);
    assert_eq!(repo.count_abiertas(hoy).unwrap(), 1);

    let invalid = ConvocatoriaInput {
        titulo: Some("Al revés".to_string()),
        fecha_apertura: Some("2025-05-01".to_string()),
        fecha_cierre: Some("2025-04-01".to_string()),
        ..ConvocatoriaInput::default()
    };
    assert!(matches!(
        repo.create(&invalid),
        Err(RepoError::Validation(_))
    ));
}

#[test]
fn statistics_aggregate_all_tables() {
    let conn = open_db_in_memory().unwrap();
    let investigadores = SqliteInvestigadorRepository::try_new(&conn).unwrap();
    let ana = investigadores
        .create(&NuevoInvestigador {
            nombre_completo: "Ana Ruiz".to_string(),
            ..NuevoInvestigador::default()
        })
        .unwrap();
    investigadores
        .create(&NuevoInvestigador {
            nombre_completo: "Luis Pérez".to_string(),
            ..NuevoInvestigador::default()
        })
        .unwrap();
    investigadores.set_activo(ana, false).unwrap();
    SqliteProyectoRepository::try_new(&conn)
        .unwrap()
        .create(&proyecto("Agua", "Hidrología", "2024-01-01"), Some(ana))
        .unwrap();

    let service = EstadisticasService::try_new(&conn).unwrap();
    let totales = service.totales(date("2025-01-01")).unwrap();
    assert_eq!(totales.investigadores, 2);
    assert_eq!(totales.investigadores_activos, 1);
    assert_eq!(totales.proyectos, 1);
    assert_eq!(totales.publicaciones, 0);
    assert_eq!(totales.convocatorias_abiertas, 0);

    investigadores.touch_actividad(ana, 1_000_000).unwrap();
    let activos = service.usuarios_activos(15, 1_000_000 + 60_000).unwrap();
    assert_eq!(activos.activos, 1);
    assert_eq!(activos.total, 2);
}

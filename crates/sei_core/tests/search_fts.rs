use sei_core::db::open_db_in_memory;
use sei_core::model::investigador::NuevoInvestigador;
use sei_core::model::proyecto::ProyectoInput;
use sei_core::model::publicacion::PublicacionInput;
use sei_core::repo::investigador_repo::{InvestigadorRepository, SqliteInvestigadorRepository};
use sei_core::repo::proyecto_repo::{ProyectoRepository, SqliteProyectoRepository};
use sei_core::repo::publicacion_repo::{PublicacionRepository, SqlitePublicacionRepository};
use sei_core::{search_all, search_investigadores, SearchError, SearchKind, SearchQuery};

fn investigador(nombre: &str, correo: &str, institucion: &str, area: &str) -> NuevoInvestigador {
    NuevoInvestigador {
        nombre_completo: nombre.to_string(),
        correo: Some(correo.to_string()),
        institucion: Some(institucion.to_string()),
        area: Some(area.to_string()),
        ..NuevoInvestigador::default()
    }
}

#[test]
fn search_spans_researchers_projects_and_publications() {
    let conn = open_db_in_memory().unwrap();
    let investigadores = SqliteInvestigadorRepository::try_new(&conn).unwrap();
    let proyectos = SqliteProyectoRepository::try_new(&conn).unwrap();
    let publicaciones = SqlitePublicacionRepository::try_new(&conn).unwrap();

    let ana = investigadores
        .create(&investigador("Ana Ruiz", "ana@uach.mx", "UACH", "Hidrología"))
        .unwrap();
    let proyecto = proyectos
        .create(
            &ProyectoInput {
                titulo: Some("Recarga de acuíferos".to_string()),
                descripcion: Some("Balance hídrico".to_string()),
                resumen: Some("Modelos de hidrología subterránea".to_string()),
                categoria: Some("Hidrología".to_string()),
                autor: Some("Ana Ruiz".to_string()),
                institucion: Some("UACH".to_string()),
                fecha_inicio: Some("2024-01-01".to_string()),
                ..ProyectoInput::default()
            },
            Some(ana),
        )
        .unwrap();
    publicaciones
        .create(
            &PublicacionInput {
                titulo: Some("Sequías en Chihuahua".to_string()),
                autor: Some("Luis Pérez".to_string()),
                resumen: Some("Series de hidrologia regional".to_string()),
                ..PublicacionInput::default()
            },
            None,
        )
        .unwrap();

    // Diacritics are folded by the tokenizer.
    let hits = search_all(&conn, &SearchQuery::new("hidrologia")).unwrap();
    assert_eq!(hits.len(), 3);

    let mut only_projects = SearchQuery::new("hidrolog");
    only_projects.kind = Some(SearchKind::Proyecto);
    let hits = search_all(&conn, &only_projects).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, proyecto);
    assert_eq!(hits[0].titulo, "Recarga de acuíferos");
    assert!(hits[0]
        .slug
        .as_deref()
        .unwrap()
        .starts_with("recarga-de-acuiferos-"));
}

#[test]
fn search_reflects_updates_and_deactivation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteInvestigadorRepository::try_new(&conn).unwrap();
    let id = repo
        .create(&investigador("Marta Soto", "marta@itcj.mx", "ITCJ", "Química"))
        .unwrap();

    let hits = search_all(&conn, &SearchQuery::new("quimica")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, SearchKind::Investigador);
    assert_eq!(hits[0].id, id);

    repo.set_activo(id, false).unwrap();
    assert!(search_all(&conn, &SearchQuery::new("quimica"))
        .unwrap()
        .is_empty());

    repo.set_activo(id, true).unwrap();
    assert_eq!(
        search_all(&conn, &SearchQuery::new("marta")).unwrap().len(),
        1
    );

    repo.delete(id).unwrap();
    assert!(search_all(&conn, &SearchQuery::new("marta"))
        .unwrap()
        .is_empty());
}

#[test]
fn blank_query_returns_nothing_and_bad_raw_syntax_is_reported() {
    let conn = open_db_in_memory().unwrap();
    assert!(search_all(&conn, &SearchQuery::new("   ")).unwrap().is_empty());

    let mut raw = SearchQuery::new("\"unterminated");
    raw.raw_fts_syntax = true;
    let err = search_all(&conn, &raw).unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery { .. }));
}

#[test]
fn directory_lookup_matches_name_email_and_institution() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteInvestigadorRepository::try_new(&conn).unwrap();
    repo.create(&investigador("Ana Ruiz", "ana@uach.mx", "UACH", "Hidrología"))
        .unwrap();
    repo.create(&investigador("Luis Pérez", "lperez@itcj.mx", "ITCJ", "Física"))
        .unwrap();
    let hidden = repo
        .create(&investigador("Ana Inactiva", "ina@uach.mx", "UACH", "Física"))
        .unwrap();
    repo.set_activo(hidden, false).unwrap();

    let by_name = search_investigadores(&conn, "ana", None).unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].nombre_completo, "Ana Ruiz");

    let by_email = search_investigadores(&conn, "lperez@", None).unwrap();
    assert_eq!(by_email.len(), 1);

    let by_institution = search_investigadores(&conn, "itcj", None).unwrap();
    assert_eq!(by_institution.len(), 1);

    // Short terms list the active directory alphabetically.
    let listing = search_investigadores(&conn, "a", None).unwrap();
    let names: Vec<_> = listing.iter().map(|i| i.nombre_completo.as_str()).collect();
    assert_eq!(names, vec!["Ana Ruiz", "Luis Pérez"]);

    // LIKE wildcards in the term are literal.
    assert!(search_investigadores(&conn, "%%", None).unwrap().is_empty());
}

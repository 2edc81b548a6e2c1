use rusqlite::Connection;
use sei_core::db::migrations::{apply_migrations, current_user_version, latest_version};
use sei_core::db::{open_db, open_db_in_memory, DbError};
use sei_core::repo::investigador_repo::SqliteInvestigadorRepository;
use sei_core::RepoError;

const DIRECTORY_TABLES: [&str; 11] = [
    "investigadores",
    "instituciones",
    "proyectos",
    "publicaciones",
    "convocatorias",
    "conexiones",
    "mensajes",
    "credenciales",
    "sesiones",
    "registros_pendientes",
    "busqueda_fts",
];

fn tables(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

#[test]
fn fresh_memory_database_has_full_schema() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());

    let present = tables(&conn);
    for table in DIRECTORY_TABLES {
        assert!(present.iter().any(|name| name == table), "missing {table}");
    }
}

#[test]
fn reopening_a_file_keeps_rows_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sei.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO instituciones (nombre, created_at, updated_at) VALUES ('UACJ', 0, 0)",
        [],
    )
    .unwrap();
    drop(conn);

    let mut conn = open_db(&path).unwrap();
    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM instituciones", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn file_databases_use_write_ahead_logging() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.sqlite3")).unwrap();
    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 999;")
        .unwrap();

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unreadable_path_reports_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = open_db(dir.path().join("no-such-dir").join("sei.sqlite3")).unwrap_err();
    assert!(matches!(err, DbError::Open { .. }), "{err}");
}

#[test]
fn repositories_need_a_migrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteInvestigadorRepository::try_new(&conn),
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}

#[test]
fn deleting_a_researcher_cascades_to_credentials() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO investigadores (id, nombre_completo) VALUES (7, 'Ana Ruiz Soto');
         INSERT INTO credenciales (investigador_id, password_hash, password_salt)
         VALUES (7, 'hash', 'salt');
         DELETE FROM investigadores WHERE id = 7;",
    )
    .unwrap();

    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM credenciales", [], |row| row.get(0))
        .unwrap();
    assert_eq!(left, 0);
}

//! Operator command line for the researcher directory.
//!
//! # Responsibility
//! - Run maintenance against a database file without starting the server.
//! - Scrape CV identifiers from a local file for quick inspection.
//!
//! # Invariants
//! - Every command that opens a database applies pending migrations first.
//! - Failures print a single line on stderr and exit with status 1.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rusqlite::Connection;
use sei_core::db::migrations::latest_version;
use sei_core::extract::{ensure_sufficient_text, DEFAULT_EXTRACT_TIMEOUT};
use sei_core::repo::credencial_repo::SqliteCredencialRepository;
use sei_core::repo::investigador_repo::{InvestigadorRepository, SqliteInvestigadorRepository};
use sei_core::repo::registro_repo::SqliteRegistroRepository;
use sei_core::repo::sesion_repo::SqliteSesionRepository;
use sei_core::service::investigador_service::InvestigadorService;
use sei_core::service::registro_service::{LogNotifier, RegistroService};
use sei_core::{AuthService, Investigador, NuevoInvestigador, Origen};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "sei")]
#[command(version, about = "Maintenance tools for the SEI researcher directory", long_about = None)]
struct Cli {
    /// Log level for stderr output
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the core library is linked
    Ping,

    /// Print the core library version
    Version,

    /// Create or upgrade the database schema
    Migrate {
        /// SQLite database file
        #[arg(long, default_value = "sei.sqlite3")]
        db: PathBuf,
    },

    /// Extract CURP, RFC, CVU and contact fields from a CV
    Extract {
        /// PDF or plain-text file
        file: PathBuf,

        /// pdftotext executable used for PDF input
        #[arg(long, default_value = "pdftotext")]
        pdftotext: String,
    },

    /// Delete expired registration requests and sessions
    Cleanup {
        /// SQLite database file
        #[arg(long, default_value = "sei.sqlite3")]
        db: PathBuf,
    },

    /// Create an administrator account, or promote an existing one
    CreateAdmin {
        /// SQLite database file
        #[arg(long, default_value = "sei.sqlite3")]
        db: PathBuf,

        #[arg(long)]
        correo: String,

        #[arg(long)]
        nombre: String,

        #[arg(long)]
        password: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = sei_core::init_stderr_logging(&cli.log_level) {
        eprintln!("sei: {err}");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sei: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Ping => println!("sei_core ping={}", sei_core::ping()),
        Commands::Version => println!("sei_core version={}", sei_core::core_version()),
        Commands::Migrate { db } => {
            open(&db)?;
            println!("schema_version={} db={}", latest_version(), db.display());
        }
        Commands::Extract { file, pdftotext } => {
            let report = extract_report(&file, &pdftotext)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Cleanup { db } => {
            let conn = open(&db)?;
            let (registros, sesiones) = cleanup(&conn)?;
            println!("registros_eliminados={registros} sesiones_eliminadas={sesiones}");
        }
        Commands::CreateAdmin {
            db,
            correo,
            nombre,
            password,
        } => {
            let conn = open(&db)?;
            let admin = create_admin(&conn, &correo, &nombre, &password)?;
            println!(
                "admin id={} slug={} correo={}",
                admin.id,
                admin.slug.as_deref().unwrap_or("-"),
                correo
            );
        }
    }
    Ok(())
}

fn open(db: &Path) -> Result<Connection> {
    sei_core::open_db(db).with_context(|| format!("cannot open `{}`", db.display()))
}

fn extract_report(file: &Path, pdftotext: &str) -> Result<serde_json::Value> {
    let bytes = fs::read(file).with_context(|| format!("cannot read `{}`", file.display()))?;
    let is_pdf = bytes.starts_with(b"%PDF")
        || file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let (text, pages) = if is_pdf {
        let pdf = sei_core::extract_pdf_text(&bytes, pdftotext, DEFAULT_EXTRACT_TIMEOUT)?;
        (pdf.text, Some(pdf.pages))
    } else {
        (String::from_utf8_lossy(&bytes).into_owned(), None)
    };
    ensure_sufficient_text(&text)?;

    let fields = sei_core::extract_fields(&text);
    info!(
        "event=cli_extract module=cli status=ok found={}",
        fields.found_fields().len()
    );
    Ok(json!({
        "data": fields,
        "campos_encontrados": fields.found_fields(),
        "metadata": {
            "filename": file.file_name().map(|name| name.to_string_lossy().into_owned()),
            "pages": pages,
            "text_length": text.chars().count(),
        },
    }))
}

fn cleanup(conn: &Connection) -> Result<(usize, usize)> {
    let now = sei_core::now_epoch_ms();
    let registro = RegistroService::new(
        SqliteInvestigadorRepository::try_new(conn)?,
        SqliteRegistroRepository::try_new(conn)?,
        SqliteCredencialRepository::try_new(conn)?,
        LogNotifier,
    );
    let registros = registro.limpiar_expirados(now)?;
    let sesiones = auth(conn)?.purge_expired(now)?;
    Ok((registros, sesiones))
}

fn create_admin(
    conn: &Connection,
    correo: &str,
    nombre: &str,
    password: &str,
) -> Result<Investigador> {
    let correo = correo.trim().to_lowercase();
    if correo.is_empty() {
        bail!("correo is required");
    }

    let repo = SqliteInvestigadorRepository::try_new(conn)?;
    let existente = repo.get_by_correo(&correo)?;
    let service = InvestigadorService::new(repo);
    let id = match existente {
        Some(investigador) => investigador.id,
        None => {
            service
                .registrar(NuevoInvestigador {
                    nombre_completo: nombre.to_string(),
                    correo: Some(correo.clone()),
                    origen: Origen::Admin,
                    ..NuevoInvestigador::default()
                })?
                .id
        }
    };

    auth(conn)?.set_password(id, password)?;
    service.activar(id)?;
    let admin = service.asignar_roles(id, true, false)?;
    info!("event=cli_create_admin module=cli status=ok id={id}");
    Ok(admin)
}

fn auth(
    conn: &Connection,
) -> Result<
    AuthService<
        SqliteInvestigadorRepository<'_>,
        SqliteCredencialRepository<'_>,
        SqliteSesionRepository<'_>,
    >,
> {
    Ok(AuthService::new(
        SqliteInvestigadorRepository::try_new(conn)?,
        SqliteCredencialRepository::try_new(conn)?,
        SqliteSesionRepository::try_new(conn)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_admin_parses_required_flags() {
        let cli = Cli::try_parse_from([
            "sei",
            "create-admin",
            "--db",
            "x.sqlite3",
            "--correo",
            "admin@sei.mx",
            "--nombre",
            "Admin SEI",
            "--password",
            "chihuahua-2024",
        ])
        .unwrap();
        match cli.command {
            Commands::CreateAdmin { db, correo, .. } => {
                assert_eq!(db, PathBuf::from("x.sqlite3"));
                assert_eq!(correo, "admin@sei.mx");
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["sei", "create-admin", "--correo", "a@b.mx"]).is_err());
    }

    #[test]
    fn create_admin_promotes_and_sets_password() {
        let conn = sei_core::open_db_in_memory().unwrap();
        let admin = create_admin(&conn, " Admin@SEI.mx ", "Admin SEI", "chihuahua-2024").unwrap();
        assert!(admin.es_admin);
        assert_eq!(admin.correo.as_deref(), Some("admin@sei.mx"));

        let token = auth(&conn)
            .unwrap()
            .login("admin@sei.mx", "chihuahua-2024", sei_core::now_epoch_ms())
            .unwrap();
        assert!(token.usuario.es_admin);

        let again = create_admin(&conn, "admin@sei.mx", "Otro Nombre", "otra-clave-2024").unwrap();
        assert_eq!(again.id, admin.id);
    }

    #[test]
    fn cleanup_on_fresh_database_removes_nothing() {
        let conn = sei_core::open_db_in_memory().unwrap();
        assert_eq!(cleanup(&conn).unwrap(), (0, 0));
    }

    #[test]
    fn extract_reads_plain_text_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.txt");
        fs::write(
            &path,
            "Nombre: Ana Ruiz Soto\nCURP: RUSA850101MCHZTN09\nCorreo: ana.ruiz@uach.mx\n",
        )
        .unwrap();

        let report = extract_report(&path, "pdftotext").unwrap();
        assert_eq!(report["data"]["curp"], "RUSA850101MCHZTN09");
        assert!(report["campos_encontrados"]
            .as_array()
            .unwrap()
            .iter()
            .any(|name| name == "correo"));
        assert!(report["metadata"]["pages"].is_null());
    }

    #[test]
    fn extract_rejects_nearly_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vacio.txt");
        fs::write(&path, "hola").unwrap();
        assert!(extract_report(&path, "pdftotext").is_err());
    }
}

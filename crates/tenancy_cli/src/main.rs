//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tenancy_core` linkage and storage bootstrap from a shell.
//! - Print the session's current domain and its ancestry.
//!
//! Usage: `tenancy_cli [DB_PATH|:memory:] [DOMAIN_NAME]`
//!
//! Set `TENANCY_LOG_DIR` (absolute path) to enable file logging.

use std::error::Error;
use std::process::ExitCode;
use tenancy_core::db::open_db;
use tenancy_core::{Environment, GenesisSeed, Identity, SqliteStorage};

const IN_MEMORY: &str = ":memory:";
const LOG_DIR_ENV: &str = "TENANCY_LOG_DIR";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tenancy_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        tenancy_core::init_logging(tenancy_core::default_log_level(), &log_dir)?;
    }

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(|| IN_MEMORY.to_string());
    let domain_name = args.next();

    let storage = if db_path == IN_MEMORY {
        SqliteStorage::open_in_memory()?
    } else {
        SqliteStorage::try_new(open_db(&db_path)?)?
    };
    let env = Environment::new(Box::new(storage), GenesisSeed::default());

    println!("tenancy_core ping={}", tenancy_core::ping());
    println!("tenancy_core version={}", tenancy_core::core_version());
    println!("session={}", env.session_id());

    let current = match domain_name {
        Some(name) => env.enter(&name)?,
        None => env.current_domain(),
    };
    println!(
        "domain name={} id={} depth_allowed={}",
        current.name(),
        format_id(current.id()),
        current.declared_depth_allowed()
    );
    for ancestor in current.ancestry(&env) {
        println!("  origin name={} id={}", ancestor.name(), format_id(ancestor.id()));
    }
    Ok(())
}

fn format_id(id: Option<i64>) -> String {
    id.map_or_else(|| "draft".to_string(), |id| id.to_string())
}

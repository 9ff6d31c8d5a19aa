mod commands;
pub mod pickers;
mod user;

pub use commands::{AdminCommands, UserCommands};
pub use user::{run_user_add, run_user_list, run_user_set_unit};

use std::fs;
use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::store::{SqliteStore, Store};

fn config_for(data_dir: &str) -> ServerConfig {
    ServerConfig {
        data_dir: PathBuf::from(data_dir),
        ..ServerConfig::default()
    }
}

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let db_path = config_for(data_dir).db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'opslog admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

/// Creates the database and the blob storage directory.
pub fn run_init(data_dir: String) -> anyhow::Result<()> {
    let config = config_for(&data_dir);
    let db_path = config.db_path();

    if db_path.exists() {
        anyhow::bail!("Already initialized. Database exists at {}", db_path.display());
    }

    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(config.storage_dir())?;

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!();
    println!("Initialized opslog data directory at {}", config.data_dir.display());
    println!("  database: {}", db_path.display());
    println!("  storage:  {}", config.storage_dir().display());
    println!();
    println!("Next: add a user with 'opslog admin user add --data-dir {data_dir}'");
    println!();

    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use opslog::cli::{
    AdminCommands, UserCommands, run_init, run_user_add, run_user_list, run_user_set_unit,
};
use opslog::config::ServerConfig;
use opslog::server::{AppState, create_router};
use opslog::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "opslog")]
#[command(about = "Operations log server for gate, mail and incident records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML configuration file; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for database and photo storage
        #[arg(long)]
        data_dir: Option<String>,

        /// Public base URL for external access (e.g., "https://ops.example.com").
        /// Used for photo URLs. Defaults to http://<host>:<port>.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

fn load_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<String>,
    public_base_url: Option<String>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir.into();
    }
    if public_base_url.is_some() {
        config.public_base_url = public_base_url;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("opslog=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => run_init(data_dir)?,
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    email,
                    business_unit,
                    password,
                    non_interactive,
                } => run_user_add(data_dir, email, business_unit, password, non_interactive)?,
                UserCommands::SetUnit {
                    data_dir,
                    email,
                    business_unit,
                    clear,
                    non_interactive,
                } => run_user_set_unit(data_dir, email, business_unit, clear, non_interactive)?,
                UserCommands::List { data_dir, json } => run_user_list(data_dir, json)?,
            },
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            let config = load_config(config, host, port, data_dir, public_base_url)?;

            let db_path = config.db_path();
            if !db_path.exists() {
                bail!(
                    "Server not initialized. Run 'opslog admin init --data-dir {}' first.",
                    config.data_dir.display()
                );
            }

            let store = SqliteStore::new(&db_path)?;
            store.initialize()?;

            let state = Arc::new(AppState::new(Arc::new(store), &config));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {} (public URL {})", addr, config.base_url());

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

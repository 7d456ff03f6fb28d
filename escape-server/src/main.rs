//! Escape room progress server.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use escape_server::state::AppState;
use escape_server::store::ProgressDb;
use tracing::info;

#[derive(Parser)]
#[command(name = "escape-server")]
#[command(about = "Progress store for the container escape room")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "0.0.0.0", env = "ESCAPE_BIND")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "5000", env = "ESCAPE_PORT")]
    port: u16,

    /// JSON file for persistent progress (in-memory when omitted)
    #[arg(long, env = "ESCAPE_DATA_FILE")]
    data_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("escape_server=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let db = match &args.data_file {
        Some(path) => {
            let db = ProgressDb::load(path)?;
            info!(data_file = %path.display(), "loaded progress");
            db
        }
        None => {
            info!("no data file configured, progress is kept in memory");
            ProgressDb::new()
        }
    };
    let app = escape_server::app(AppState::new(db, args.data_file));

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

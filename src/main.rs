use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port = std::env::var("QUILL_HTTP_PORT").unwrap_or_else(|_| "3000".to_string());
    let db_folder = std::env::var("QUILL_DB_FOLDER").unwrap_or_else(|_| "dbs".to_string());
    if std::env::var("QUILL_SESSION_SECRET").is_err() {
        // Sessions are held server-side, so the secret only matters once a
        // shared external session store is wired in; flag its absence anyway.
        warn!("QUILL_SESSION_SECRET is not set");
    }
    info!(
        target: "quill",
        "quill starting: RUST_LOG='{}', http_port={}, db_root='{}'",
        rust_log, http_port, db_folder
    );

    let port: u16 = http_port.parse().unwrap_or(3000);
    quill::server::run_with_ports(port, &db_folder).await
}

use clap::Parser;
use slidesync::config::{Cli, Config, default_config_path};
use slidesync::fetch::Fetcher;
use slidesync::handler::AppState;
use slidesync::router;
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Values in the config file may refer to variables from a .env file.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to read .env file: {}", e);
        }
    }

    let config_path = match args.config_path {
        Some(path) => std::path::PathBuf::from(path),
        None => default_config_path(),
    };

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("slidesync.svc starting");

    let mut cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    if let Some(port) = args.port {
        cfg.app.set_port(port);
    }

    let catalog = cfg.catalog().unwrap_or_else(|e| {
        tracing::error!(error = %e, "invalid talk catalog");
        std::process::exit(1);
    });
    let fetcher = Fetcher::new(&cfg.app).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup http client");
        std::process::exit(1);
    });
    tracing::info!(talks = catalog.len(), content_root = ?cfg.app.content_root, "catalog loaded");

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let cancellation_token = CancellationToken::new();
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel::<()>(1);

    let app = router(AppState::new(cfg, catalog, fetcher));

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("slidesync.svc running on {}", &address);
    let shutdown_token = cancellation_token.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_token.cancelled().await;
    });

    let server_done = shutdown_complete_tx.clone();
    let mut server_task = tokio::spawn(async move {
        if let Err(err) = server.await {
            tracing::error!(error = %err, "server stopped with an error");
        }
        drop(server_done);
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
            cancellation_token.cancel();
        }
        _ = &mut server_task => {
            tracing::warn!("server exited before shutdown was requested");
        }
    }

    // Waits for in-flight requests to finish.
    drop(shutdown_complete_tx);
    shutdown_complete_rx.recv().await;
    tracing::info!("slidesync.svc going off, graceful shutdown complete");
}

use std::sync::Arc;

use anyhow::{Context, Result};
use chefgen::classify::HeuristicParser;
use chefgen_server::{
    auth::AuthKeys,
    config::Config,
    database::Database,
    generation::{GeminiBackend, Generator},
    routes::{router, AppState},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// YAML configuration file. Missing means defaults plus environment.
    #[clap(long, default_value = "chefgen.yml")]
    config: String,

    /// The address and optionally port to bind to, overriding the config
    #[clap(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    // Parse command line arguments
    let args = Args::parse();
    let mut config = Config::load(&args.config)
        .context("Loading configuration")?
        .with_env_overrides();
    if let Some(address) = args.address {
        config.server.address = address;
    }

    // initialize tracing
    let _guard = match &config.server.log_dir {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "access.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .json()
                .with_writer(non_blocking)
                .with_env_filter(EnvFilter::from_default_env())
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
            None
        }
    };

    if std::path::Path::new(&args.config).exists() {
        tracing::info!("Loaded configuration from {}", args.config);
    } else {
        tracing::warn!("No config file at {}, using defaults", args.config);
    }

    let auth = AuthKeys::from_config(&config.auth).context("Setting up authentication")?;
    let api_key = config.generation.api_key.clone().unwrap_or_else(|| {
        tracing::error!("GEMINI_API_KEY is not set; recipe generation will fail");
        String::new()
    });

    // connect to the database
    let db = Database::connect(&config.database.path)
        .await
        .context("Connecting to database")?;

    let backend = GeminiBackend::with_base_url(api_key, config.generation.base_url.clone());
    let generator = Generator::from_config(Arc::new(backend), &config.generation);
    tracing::info!(models = ?generator.models(), "Generation models");

    let app = router(AppState {
        db,
        generator,
        parser: Arc::new(HeuristicParser),
        auth,
    });

    // Plain HTTP unless a certificate is configured
    if let Some(tls) = &config.server.tls {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .context("Loading TLS certificate")?;

        let addr = config.server.address.parse()?;
        tracing::info!("Listening on {} (TLS)", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(&config.server.address)
            .await
            .with_context(|| format!("Binding {}", config.server.address))?;
        tracing::info!("Listening on {}", config.server.address);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

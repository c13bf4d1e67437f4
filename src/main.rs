use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use selfie_match::config::Settings;
use selfie_match::core::FaceCompareWorkflow;
use selfie_match::models::PermissionStatus;
use selfie_match::routes::{self, AppState};
use selfie_match::services::{RekognitionClient, S3Client, UriImageLoader};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn config_error(what: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("Failed to initialize {}: {}", what, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", what, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Configuration is needed before logging so its defaults apply
    let settings = Settings::load();

    // Initialize logging; LOG_LEVEL / LOG_FORMAT win over the config file
    let (default_level, default_format) = match &settings {
        Ok(s) => (s.logging.level.clone(), s.logging.format.clone()),
        Err(_) => ("info".to_string(), "compact".to_string()),
    };
    let log_level = std::env::var("LOG_LEVEL").unwrap_or(default_level);
    let log_format = std::env::var("LOG_FORMAT").unwrap_or(default_format);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Selfie Match service...");

    let settings = settings.map_err(|e| config_error("configuration", e))?;

    info!("Configuration loaded successfully (bucket: {}, region: {})", settings.store.bucket, settings.store.region);

    let timeout = Duration::from_secs(settings.http.timeout_secs);

    let store = S3Client::new(&settings.store, timeout).map_err(|e| config_error("object store client", e))?;
    info!("Object store client initialized");

    let comparer = RekognitionClient::new(&settings.rekognition, &settings.store, timeout)
        .map_err(|e| config_error("face comparison client", e))?;
    info!("Face comparison client initialized");

    let loader = Arc::new(
        UriImageLoader::new(&settings.media, timeout).map_err(|e| config_error("media loader", e))?,
    );

    if loader.permission().await == PermissionStatus::Denied {
        warn!("Media root {:?} is not accessible; local image handles will be rejected", settings.media.root);
    }

    let workflow = Arc::new(FaceCompareWorkflow::new(
        store,
        comparer,
        settings.rekognition.similarity_threshold,
    ));

    info!("Workflow initialized with similarity threshold {}", workflow.similarity_threshold());

    // Build application state
    let app_state = AppState { workflow, loader };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_app)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

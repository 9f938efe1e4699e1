use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use anyhow::Context;
use env_logger::Env;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod api;
pub mod certificate;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod state;
pub mod status;
pub mod storage;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::get_status,
        crate::api::handlers::validate_files,
        crate::api::handlers::generate_certificates,
        crate::api::handlers::delete_files,
        crate::api::handlers::pipeline_metrics
    ),
    components(
        schemas(
            api::models::StatusResponse,
            api::models::MessageResponse,
            api::models::NothingPendingResponse,
            api::models::PurgeResponse,
            api::models::ValidateFilesRequest,
            api::models::GenerateCertificatesRequest,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Certificates", description = "Batch certificate generation from exam exports.")
    )
)]
pub struct ApiDoc;

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app_state = AppState::new(&config).with_context(|| {
        format!(
            "failed to load certificate images (template: {})",
            config.template_path.display()
        )
    })?;
    app_state
        .pipeline
        .storage()
        .ensure_dirs()
        .context("failed to create upload/generation folders")?;
    let app_state = web::Data::new(app_state);

    let prometheus = PrometheusMetricsBuilder::new("certificate_press_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create Prometheus metrics middleware: {e}"))?;

    log::info!(
        "Starting server at http://{}:{} (signature {:?}, checkpoint {:?})",
        config.bind_addr,
        config.port,
        config.signature_mode,
        config.checkpoint_policy
    );

    let origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(api::config)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

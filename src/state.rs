use std::sync::Arc;

use crate::certificate::RenderError;
use crate::config::AppConfig;
use crate::pipeline::CertificatePipeline;
use crate::status::StatusBoard;

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub status: Arc<StatusBoard>,
    pub pipeline: Arc<CertificatePipeline>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self, RenderError> {
        let status = Arc::new(StatusBoard::new());
        let pipeline = CertificatePipeline::from_config(config, Arc::clone(&status))?;
        Ok(Self::with_pipeline(pipeline))
    }

    /// Wrap an already configured pipeline, sharing its status board.
    pub fn with_pipeline(pipeline: CertificatePipeline) -> Self {
        let pipeline = Arc::new(pipeline);
        Self {
            status: pipeline.status_handle(),
            pipeline,
        }
    }
}

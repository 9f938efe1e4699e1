use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Returned instead of a document when every eligible seat was already processed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NothingPendingResponse {
    pub message: String,
    pub rendered: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurgeResponse {
    pub message: String,
    pub uploads: usize,
    pub artifacts: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[allow(non_snake_case)]
pub struct ValidateFilesRequest {
    #[allow(unused)]
    pub ms6File: Vec<u8>,
    #[allow(unused)]
    pub bmsFile: Vec<u8>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[allow(non_snake_case)]
pub struct GenerateCertificatesRequest {
    #[allow(unused)]
    pub ms6File: Vec<u8>,
    #[allow(unused)]
    pub bmsFile: Vec<u8>,
    /// Examination session, e.g. `MAY 2024`.
    #[allow(unused)]
    pub year: String,
    #[allow(unused)]
    pub courseName: String,
    /// 1-3999, printed as a roman numeral.
    #[allow(unused)]
    pub semester: Option<String>,
    /// PNG or JPEG.
    #[allow(unused)]
    pub signature: Option<Vec<u8>>,
}

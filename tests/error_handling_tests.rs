#[cfg(test)]
mod error_handling_tests {
    use std::collections::HashMap;

    use actix_web::http::StatusCode;
    use actix_web::HttpResponse;

    use certificate_press_server::certificate::RenderError;
    use certificate_press_server::checkpoint::CheckpointPolicy;
    use certificate_press_server::config::{AppConfig, SignatureMode};
    use certificate_press_server::dataset::{ValidationError, ValidationErrors};
    use certificate_press_server::error::PipelineError;
    use certificate_press_server::ErrorResponse;

    #[test]
    fn test_error_response_constructors() {
        let error_response = ErrorResponse::bad_request("Only .xlsx or .xls files are allowed");
        assert_eq!(error_response.error, "BadRequest");
        assert!(error_response.message.contains(".xlsx"));
        assert!(!error_response.timestamp.is_empty());

        assert_eq!(ErrorResponse::internal_error("x").error, "InternalServerError");
    }

    #[test]
    fn test_validation_summary_numbers_every_problem() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::missing_upload("ms6File", "MS6"));
        errors.add(ValidationError::missing_parameter("year", "Year"));

        let message = PipelineError::from(errors).to_string();
        assert!(message.starts_with("Validation failed: 2 problems found"));
        assert!(message.contains("1. [ms6File] MS6 file is required"));
        assert!(message.contains("2. [year] Year must not be empty"));
    }

    #[test]
    fn test_render_failures_map_to_server_errors() {
        let response: HttpResponse = PipelineError::from(RenderError::InvalidSemester(4000)).into();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response: HttpResponse = PipelineError::Storage(std::io::Error::other("disk full")).into();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_config_reads_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CERT_PORT", "8080"),
            ("CERT_SIGNATURE_MODE", "required"),
            ("CERT_CHECKPOINT_POLICY", "per-record"),
            ("CERT_GEN_DIR", "  "),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.signature_mode, SignatureMode::Required);
        assert_eq!(config.checkpoint_policy, CheckpointPolicy::PerRecord);
        assert_eq!(config.gen_dir, AppConfig::default().gen_dir);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(AppConfig::from_lookup(|key| (key == "CERT_PORT").then(|| "http".to_string())).is_err());
        assert!(
            AppConfig::from_lookup(|key| (key == "CERT_SIGNATURE_MODE").then(|| "always".to_string()))
                .is_err()
        );
    }
}

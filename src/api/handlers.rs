use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info};

use crate::api::models::{
    GenerateCertificatesRequest, MessageResponse, NothingPendingResponse, PurgeResponse,
    StatusResponse, ValidateFilesRequest,
};
use crate::api::multipart_parser::MultipartParser;
use crate::error::PipelineError;
use crate::metrics;
use crate::pipeline::{RunOutcome, OUTCOMES_FIELD, ROSTER_FIELD};
use crate::state::AppState;
use crate::storage::ARTIFACT_NAME;
use crate::ErrorResponse;

fn blocking_failed(e: actix_web::error::BlockingError) -> HttpResponse {
    error!("Worker thread failed: {}", e);
    HttpResponse::InternalServerError().json(ErrorResponse::internal_error(
        "The request could not be completed",
    ))
}

#[utoipa::path(
    get,
    path = "/status",
    tag = "Certificates",
    responses(
        (status = 200, description = "Current status message", body = StatusResponse)
    )
)]
pub async fn get_status(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(StatusResponse {
        message: data.status.get(),
    })
}

#[utoipa::path(
    post,
    path = "/validate-files",
    tag = "Certificates",
    request_body(content = inline(ValidateFilesRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Both exports are usable", body = MessageResponse),
        (status = 400, description = "Missing file, wrong file type or missing columns", body = ErrorResponse)
    )
)]
pub async fn validate_files(payload: Multipart, data: web::Data<AppState>) -> HttpResponse {
    info!("Executing validate_files handler");
    let mut form = match MultipartParser::parse_form(payload).await {
        Ok(form) => form,
        Err(e) => return e.into(),
    };
    let roster = form.take_file(ROSTER_FIELD);
    let outcomes = form.take_file(OUTCOMES_FIELD);

    let pipeline = data.pipeline.clone();
    let result = web::block(move || {
        pipeline
            .validate_uploads(roster.as_ref(), outcomes.as_ref())
            .map(|_| ())
    })
    .await;

    match result {
        Ok(Ok(())) => HttpResponse::Ok().json(MessageResponse::new("Files are valid!")),
        Ok(Err(errors)) => {
            info!("Upload validation failed: {}", errors);
            PipelineError::from(errors).into()
        }
        Err(e) => blocking_failed(e),
    }
}

#[utoipa::path(
    post,
    path = "/generate-certificates",
    tag = "Certificates",
    request_body(content = inline(GenerateCertificatesRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "certificates.pdf attachment, or this JSON body when every eligible seat already has a certificate", body = NothingPendingResponse),
        (status = 400, description = "Invalid uploads or parameters", body = ErrorResponse),
        (status = 409, description = "Another run is in progress", body = ErrorResponse),
        (status = 422, description = "Result export could not be reconciled", body = ErrorResponse),
        (status = 500, description = "Rendering or storage failed", body = ErrorResponse)
    )
)]
pub async fn generate_certificates(
    req: HttpRequest,
    payload: Multipart,
    data: web::Data<AppState>,
) -> HttpResponse {
    info!("Executing generate_certificates handler");
    let form = match MultipartParser::parse_form(payload).await {
        Ok(form) => form,
        Err(e) => return e.into(),
    };
    let request = form.into_generation_request();

    let pipeline = data.pipeline.clone();
    let outcome = match web::block(move || pipeline.run(request)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return e.into(),
        Err(e) => return blocking_failed(e),
    };

    match outcome {
        RunOutcome::Generated { path, report } => {
            info!(
                "Serving {} certificate(s) on {} page(s)",
                report.rendered(),
                report.pages
            );
            match NamedFile::open_async(&path).await {
                Ok(file) => file
                    .set_content_type(mime_guess::from_path(&path).first_or_octet_stream())
                    .set_content_disposition(ContentDisposition {
                        disposition: DispositionType::Attachment,
                        parameters: vec![DispositionParam::Filename(ARTIFACT_NAME.to_string())],
                    })
                    .into_response(&req),
                Err(e) => {
                    error!("Generated document {} is unreadable: {}", path.display(), e);
                    HttpResponse::InternalServerError().json(ErrorResponse::internal_error(
                        "The generated document could not be read",
                    ))
                }
            }
        }
        RunOutcome::NothingPending { skipped } => HttpResponse::Ok().json(NothingPendingResponse {
            message: "All eligible certificates were already generated".to_string(),
            rendered: 0,
            skipped,
        }),
    }
}

#[utoipa::path(
    post,
    path = "/delete-files",
    tag = "Certificates",
    responses(
        (status = 200, description = "Uploads, documents and checkpoint removed", body = PurgeResponse),
        (status = 409, description = "A run is in progress", body = ErrorResponse),
        (status = 500, description = "Files could not be removed", body = ErrorResponse)
    )
)]
pub async fn delete_files(data: web::Data<AppState>) -> HttpResponse {
    info!("Executing delete_files handler");
    let pipeline = data.pipeline.clone();
    match web::block(move || pipeline.purge()).await {
        Ok(Ok(report)) => HttpResponse::Ok().json(PurgeResponse {
            message: "Files deleted successfully".to_string(),
            uploads: report.uploads,
            artifacts: report.artifacts,
        }),
        Ok(Err(e)) => e.into(),
        Err(e) => blocking_failed(e),
    }
}

/// Pipeline counters in the prometheus text format.
#[utoipa::path(
    get,
    path = "/pipeline-metrics",
    tag = "Certificates",
    responses(
        (status = 200, description = "Pipeline counters", body = String, content_type = "text/plain"),
        (status = 500, description = "Counters could not be encoded", body = ErrorResponse)
    )
)]
pub async fn pipeline_metrics() -> HttpResponse {
    match metrics::render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&e.to_string()))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/status").route(web::get().to(get_status)))
        .service(web::resource("/validate-files").route(web::post().to(validate_files)))
        .service(
            web::resource("/generate-certificates").route(web::post().to(generate_certificates)),
        )
        .service(web::resource("/delete-files").route(web::post().to(delete_files)))
        .service(web::resource("/pipeline-metrics").route(web::get().to(pipeline_metrics)));
}

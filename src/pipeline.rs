//! End-to-end certificate run: uploads in, stored PDF out.
//!
//! A run validates both exports, reconciles them, lays out every pending seat
//! and stores the document. The checkpoint is cleared only after the document
//! is on disk; any failure leaves it in place for the next attempt.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::certificate::{
    AssemblyOutcome, AssemblyReport, DocumentAssembler, ImageAssets, LayoutCapabilities,
    LayoutEngine, NarrativeContext, PdfCanvas, RasterImage, RenderError, TemplateGeometry,
};
use crate::checkpoint::{CheckpointPolicy, CheckpointStore};
use crate::config::{AppConfig, SignatureMode};
use crate::dataset::validation::{
    parse_semester, validate_outcomes, validate_required, validate_roster,
    validate_spreadsheet_name,
};
use crate::dataset::{reconcile, spreadsheet, Table, ValidationError, ValidationErrors};
use crate::error::PipelineError;
use crate::metrics;
use crate::status::StatusBoard;
use crate::storage::{LocalStorage, PurgeReport, ARTIFACT_NAME};

pub const ROSTER_FIELD: &str = "ms6File";
pub const OUTCOMES_FIELD: &str = "bmsFile";
pub const SIGNATURE_FIELD: &str = "signature";

pub const PROCESSING_MESSAGE: &str = "Processing request...";
pub const COMPLETED_MESSAGE: &str = "Completed";

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub roster: Option<Upload>,
    pub outcomes: Option<Upload>,
    pub year: String,
    pub course_name: String,
    pub semester: Option<String>,
    pub signature: Option<Upload>,
    /// Defaults to today.
    pub issue_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug)]
pub enum RunOutcome {
    Generated { path: PathBuf, report: AssemblyReport },
    NothingPending { skipped: usize },
}

/// Inputs that passed validation.
struct ValidatedRun {
    roster: Table,
    outcomes: Table,
    context: NarrativeContext,
    signature: Option<RasterImage>,
}

pub struct CertificatePipeline {
    storage: LocalStorage,
    checkpoint: CheckpointStore,
    status: Arc<StatusBoard>,
    template: RasterImage,
    mark: Option<RasterImage>,
    signature_mode: SignatureMode,
    policy: CheckpointPolicy,
    state: Mutex<RunState>,
}

impl CertificatePipeline {
    pub fn new(
        storage: LocalStorage,
        checkpoint: CheckpointStore,
        template: RasterImage,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            storage,
            checkpoint,
            status,
            template,
            mark: None,
            signature_mode: SignatureMode::default(),
            policy: CheckpointPolicy::default(),
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Load the template and mark images named by `config`.
    pub fn from_config(config: &AppConfig, status: Arc<StatusBoard>) -> Result<Self, RenderError> {
        let template = RasterImage::open(&config.template_path, "template")?;
        let mark = config
            .mark_path
            .as_deref()
            .map(|path| RasterImage::open(path, "mark"))
            .transpose()?;

        Ok(Self::new(
            LocalStorage::new(&config.upload_dir, &config.gen_dir),
            CheckpointStore::new(&config.checkpoint_file),
            template,
            status,
        )
        .with_mark(mark)
        .with_signature_mode(config.signature_mode)
        .with_policy(config.checkpoint_policy))
    }

    pub fn with_mark(mut self, mark: Option<RasterImage>) -> Self {
        self.mark = mark;
        self
    }

    pub fn with_signature_mode(mut self, mode: SignatureMode) -> Self {
        self.signature_mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn status_handle(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.status)
    }

    pub fn run_state(&self) -> RunState {
        *self.state.lock()
    }

    /// Check both uploads without generating anything.
    pub fn validate_uploads(
        &self,
        roster: Option<&Upload>,
        outcomes: Option<&Upload>,
    ) -> Result<(Table, Table), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let roster = self.read_upload(roster, ROSTER_FIELD, "MS6", &mut errors);
        let outcomes = self.read_upload(outcomes, OUTCOMES_FIELD, "BMS", &mut errors);

        if let Some(table) = &roster {
            validate_roster(table, ROSTER_FIELD, &mut errors);
        }
        if let Some(table) = &outcomes {
            validate_outcomes(table, OUTCOMES_FIELD, &mut errors);
        }

        match (roster, outcomes) {
            (Some(roster), Some(outcomes)) if errors.is_empty() => Ok((roster, outcomes)),
            _ => Err(errors),
        }
    }

    /// Validate, reconcile, render and store one batch.
    pub fn run(&self, request: GenerationRequest) -> Result<RunOutcome, PipelineError> {
        self.begin()?;
        let result = self
            .validate_request(request)
            .and_then(|run| self.generate(&run.roster, &run.outcomes, run.context, run.signature));
        self.end(&result);
        result
    }

    /// Same as [`run`](Self::run) for tables already in memory.
    pub fn run_tables(
        &self,
        roster: &Table,
        outcomes: &Table,
        context: NarrativeContext,
        signature: Option<RasterImage>,
    ) -> Result<RunOutcome, PipelineError> {
        self.begin()?;
        let result = self.generate(roster, outcomes, context, signature);
        self.end(&result);
        result
    }

    /// Remove stored uploads, generated documents and the checkpoint.
    pub fn purge(&self) -> Result<PurgeReport, PipelineError> {
        // Held until the purge is done so a run cannot start halfway through.
        let mut state = self.state.lock();
        if *state == RunState::Processing {
            return Err(PipelineError::AlreadyRunning);
        }
        let report = self.storage.purge().map_err(PipelineError::Storage)?;
        if let Err(e) = self.checkpoint.clear() {
            log::error!("Failed to clear checkpoint: {}", e);
        }
        *state = RunState::Idle;
        self.status.set(crate::status::IDLE_MESSAGE);
        Ok(report)
    }

    fn begin(&self) -> Result<(), PipelineError> {
        let mut state = self.state.lock();
        if *state == RunState::Processing {
            log::warn!("Rejected a run while another one is processing");
            return Err(PipelineError::AlreadyRunning);
        }
        *state = RunState::Processing;
        self.status.set(PROCESSING_MESSAGE);
        Ok(())
    }

    fn end(&self, result: &Result<RunOutcome, PipelineError>) {
        let state = match result {
            Ok(_) => {
                self.status.set(COMPLETED_MESSAGE);
                metrics::record_run("completed");
                RunState::Completed
            }
            Err(e) => {
                log::error!("Certificate run failed: {}", e);
                self.status
                    .set(format!("Error generating certificates: {e}"));
                metrics::record_run("failed");
                RunState::Failed
            }
        };
        *self.state.lock() = state;
    }

    fn validate_request(&self, request: GenerationRequest) -> Result<ValidatedRun, PipelineError> {
        let mut errors = ValidationErrors::new();
        let tables = self.validate_uploads(request.roster.as_ref(), request.outcomes.as_ref());
        let tables = match tables {
            Ok(tables) => Some(tables),
            Err(upload_errors) => {
                for error in upload_errors.errors() {
                    errors.add(error.clone());
                }
                None
            }
        };

        validate_required(&request.year, "year", "Year", &mut errors);
        validate_required(&request.course_name, "courseName", "Course name", &mut errors);
        let semester = parse_semester(request.semester.as_deref(), &mut errors);
        let signature = self.decode_signature(request.signature.as_ref(), &mut errors);

        let (roster, outcomes) = match tables {
            Some(tables) if errors.is_empty() => tables,
            _ => return Err(errors.into()),
        };

        let mut context =
            NarrativeContext::new(request.year, request.course_name).with_semester(semester);
        if let Some(date) = request.issue_date {
            context = context.with_issue_date(date);
        }
        Ok(ValidatedRun {
            roster,
            outcomes,
            context,
            signature,
        })
    }

    fn read_upload(
        &self,
        upload: Option<&Upload>,
        field: &str,
        label: &str,
        errors: &mut ValidationErrors,
    ) -> Option<Table> {
        let Some(upload) = upload.filter(|u| !u.filename.trim().is_empty()) else {
            errors.add(ValidationError::missing_upload(field, label));
            return None;
        };

        let before = errors.len();
        validate_spreadsheet_name(&upload.filename, field, errors);
        if errors.len() > before {
            return None;
        }

        let stored = match self.storage.save_upload(&upload.filename, &upload.bytes) {
            Ok(stored) => stored,
            Err(e) => {
                errors.add(ValidationError::unreadable_workbook(field, e));
                return None;
            }
        };
        let bytes = match stored.read() {
            Ok(bytes) => bytes,
            Err(e) => {
                errors.add(ValidationError::unreadable_workbook(field, e));
                return None;
            }
        };

        match spreadsheet::read_table(&bytes, field) {
            Ok(table) => {
                log::info!(
                    "Read {} row(s) from '{}' ({})",
                    table.len(),
                    upload.filename,
                    field
                );
                Some(table)
            }
            Err(e) => {
                errors.add(e);
                None
            }
        }
    }

    fn decode_signature(
        &self,
        upload: Option<&Upload>,
        errors: &mut ValidationErrors,
    ) -> Option<RasterImage> {
        let upload = upload.filter(|u| !u.bytes.is_empty());
        match upload {
            None => {
                if self.signature_mode == SignatureMode::Required {
                    errors.add(ValidationError::missing_upload(SIGNATURE_FIELD, "Signature"));
                }
                None
            }
            Some(upload) => match RasterImage::decode_signature(&upload.bytes) {
                Ok(image) => Some(image),
                Err(e) => {
                    log::warn!("Rejected signature '{}': {}", upload.filename, e);
                    errors.add(ValidationError::invalid_image(SIGNATURE_FIELD, &upload.filename));
                    None
                }
            },
        }
    }

    fn generate(
        &self,
        roster: &Table,
        outcomes: &Table,
        context: NarrativeContext,
        signature: Option<RasterImage>,
    ) -> Result<RunOutcome, PipelineError> {
        let started = Instant::now();
        if self.signature_mode == SignatureMode::Required && signature.is_none() {
            return Err(RenderError::MissingSignature.into());
        }

        let records = reconcile(roster, outcomes)?;

        let capabilities = LayoutCapabilities {
            has_signature: signature.is_some(),
            has_semester: context.semester.is_some(),
            has_mark: self.mark.is_some(),
        };
        let engine = LayoutEngine::new(TemplateGeometry::standard(), capabilities);
        let assets = ImageAssets::new(self.template.clone())
            .with_mark(self.mark.clone())
            .with_signature(signature);
        let canvas = PdfCanvas::new(&assets, engine.geometry().baseline);

        let snapshot = self.checkpoint.load();
        let outcome = DocumentAssembler::new(&engine, &self.checkpoint)
            .with_policy(self.policy)
            .with_status(&self.status)
            .assemble(records, &context, canvas)?;

        let outcome = match outcome {
            AssemblyOutcome::Rendered { document, report } => {
                let path = match self.storage.write_artifact(ARTIFACT_NAME, &document) {
                    Ok(path) => path,
                    Err(e) => {
                        // The rendered seats never reached the disk.
                        if let Err(restore_err) = self.checkpoint.restore(snapshot) {
                            log::error!("Failed to restore checkpoint: {}", restore_err);
                        }
                        return Err(PipelineError::Storage(e));
                    }
                };
                RunOutcome::Generated { path, report }
            }
            AssemblyOutcome::NothingPending { skipped } => RunOutcome::NothingPending { skipped },
        };

        if let Err(e) = self.checkpoint.clear() {
            log::error!("Document stored but the checkpoint could not be cleared: {}", e);
        }
        log::info!("Certificate run finished in {:.2?}", started.elapsed());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Stage;
    use crate::dataset::{Cell, SeatNo};

    fn pipeline(dir: &tempfile::TempDir) -> CertificatePipeline {
        CertificatePipeline::new(
            LocalStorage::new(dir.path().join("uploads"), dir.path().join("gens")),
            CheckpointStore::new(dir.path().join("checkpoint.json")),
            RasterImage {
                width: 1,
                height: 1,
                rgb: vec![255; 3],
            },
            Arc::new(StatusBoard::new()),
        )
    }

    fn tables() -> (Table, Table) {
        let roster = Table::from_rows(&["COLL_NO"], vec![vec![Cell::Int(3)]]);
        let outcomes = Table::from_rows(
            &["COLL_NO", "SEAT_NO", "NAME", "SEX", "RSLT", "FREM", "RES", "GRADE"],
            vec![
                vec![
                    Cell::Int(3),
                    Cell::Int(501),
                    Cell::from("ANIL SHAH"),
                    Cell::Int(1),
                    Cell::from("P"),
                    Cell::Empty,
                    Cell::Empty,
                    Cell::from("O"),
                ],
                vec![
                    Cell::Int(3),
                    Cell::Int(502),
                    Cell::from("RUPA SHAH"),
                    Cell::Int(2),
                    Cell::from("P"),
                    Cell::Empty,
                    Cell::Empty,
                    Cell::from("A"),
                ],
            ],
        );
        (roster, outcomes)
    }

    #[test]
    fn test_successful_run_stores_document_and_clears_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir);
        let (roster, outcomes) = tables();

        let outcome = pipeline
            .run_tables(&roster, &outcomes, NarrativeContext::new("MAY 2024", "B.COM"), None)
            .unwrap();
        let RunOutcome::Generated { path, report } = outcome else {
            panic!("expected a document");
        };
        assert!(path.ends_with(ARTIFACT_NAME));
        assert!(path.exists());
        assert_eq!(report.rendered(), 2);
        assert_eq!(report.pages, 1);
        assert!(!pipeline.checkpoint().path().exists());
        assert_eq!(pipeline.run_state(), RunState::Completed);
        assert_eq!(pipeline.status().get(), COMPLETED_MESSAGE);
    }

    #[test]
    fn test_fully_processed_batch_reports_nothing_pending() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir);
        for seat in ["501", "502"] {
            pipeline.checkpoint().record(&SeatNo::from(seat), Stage::Start);
        }
        let (roster, outcomes) = tables();

        let outcome = pipeline
            .run_tables(&roster, &outcomes, NarrativeContext::new("MAY 2024", "B.COM"), None)
            .unwrap();
        assert!(matches!(outcome, RunOutcome::NothingPending { skipped: 2 }));
        assert!(pipeline.checkpoint().load().is_zero());
    }

    #[test]
    fn test_required_signature_fails_without_touching_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir).with_signature_mode(SignatureMode::Required);
        pipeline.checkpoint().record(&SeatNo::from("501"), Stage::Start);
        let (roster, outcomes) = tables();

        let err = pipeline
            .run_tables(&roster, &outcomes, NarrativeContext::new("MAY 2024", "B.COM"), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Render(RenderError::MissingSignature)));
        assert_eq!(pipeline.run_state(), RunState::Failed);
        assert!(pipeline.status().get().starts_with("Error generating certificates"));
        assert_eq!(pipeline.checkpoint().load().processed.len(), 1);
    }

    #[test]
    fn test_request_validation_collects_every_problem() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir);
        let request = GenerationRequest {
            outcomes: Some(Upload::new("results.csv", b"a,b".to_vec())),
            semester: Some("sixth".to_string()),
            ..Default::default()
        };

        let Err(PipelineError::Validation(errors)) = pipeline.run(request) else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![ROSTER_FIELD, OUTCOMES_FIELD, "year", "courseName", "semester"]
        );
        assert_eq!(fs_entries(&dir.path().join("uploads")), 0);
    }

    #[test]
    fn test_purge_resets_state() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir);
        let (roster, outcomes) = tables();
        pipeline
            .run_tables(&roster, &outcomes, NarrativeContext::new("MAY 2024", "B.COM"), None)
            .unwrap();
        pipeline.checkpoint().record(&SeatNo::from("501"), Stage::Start);

        let report = pipeline.purge().unwrap();
        assert_eq!(report.artifacts, 1);
        assert!(pipeline.checkpoint().load().is_zero());
        assert_eq!(pipeline.run_state(), RunState::Idle);
    }

    #[test]
    fn test_purge_is_refused_while_a_run_holds_the_state() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir);
        let (roster, outcomes) = tables();
        pipeline
            .run_tables(&roster, &outcomes, NarrativeContext::new("MAY 2024", "B.COM"), None)
            .unwrap();

        pipeline.begin().unwrap();
        assert!(matches!(pipeline.purge(), Err(PipelineError::AlreadyRunning)));
        assert!(pipeline.storage().artifact_path(ARTIFACT_NAME).exists());
        assert_eq!(pipeline.run_state(), RunState::Processing);
    }

    #[test]
    fn test_failed_store_rewinds_per_record_progress() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&dir).with_policy(CheckpointPolicy::PerRecord);
        std::fs::write(dir.path().join("gens"), b"not a directory").unwrap();
        let (roster, outcomes) = tables();

        let err = pipeline
            .run_tables(&roster, &outcomes, NarrativeContext::new("MAY 2024", "B.COM"), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
        assert!(pipeline.checkpoint().load().is_zero());

        std::fs::remove_file(dir.path().join("gens")).unwrap();
        let RunOutcome::Generated { report, .. } = pipeline
            .run_tables(&roster, &outcomes, NarrativeContext::new("MAY 2024", "B.COM"), None)
            .unwrap()
        else {
            panic!("expected a document");
        };
        assert_eq!(report.rendered(), 2);
    }

    fn fs_entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }
}

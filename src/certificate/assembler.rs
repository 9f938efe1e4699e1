//! Document assembly: pending records to one multi-page document.

use std::time::Instant;

use super::geometry::slot_for;
use super::layout::LayoutEngine;
use super::narrative::NarrativeContext;
use super::pdf::DocumentSink;
use super::RenderError;
use crate::checkpoint::{CheckpointPolicy, CheckpointState, CheckpointStore, Stage};
use crate::dataset::{dedupe_by_seat, EligibleRecord, SeatNo};
use crate::metrics;
use crate::status::StatusBoard;

/// Stage label written to the checkpoint while slots are being laid out.
pub const GENERATION_STAGE: &str = "certificate_generation";

/// Status is refreshed after this many certificates.
const PROGRESS_INTERVAL: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Seats rendered, in document order.
    pub seats: Vec<SeatNo>,
    /// Records dropped as duplicates or already processed.
    pub skipped: usize,
    pub pages: usize,
}

impl AssemblyReport {
    pub fn rendered(&self) -> usize {
        self.seats.len()
    }
}

#[derive(Debug)]
pub enum AssemblyOutcome {
    Rendered {
        document: Vec<u8>,
        report: AssemblyReport,
    },
    /// Every eligible seat already has a certificate.
    NothingPending { skipped: usize },
}

pub struct DocumentAssembler<'a> {
    engine: &'a LayoutEngine,
    checkpoint: &'a CheckpointStore,
    policy: CheckpointPolicy,
    status: Option<&'a StatusBoard>,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(engine: &'a LayoutEngine, checkpoint: &'a CheckpointStore) -> Self {
        Self {
            engine,
            checkpoint,
            policy: CheckpointPolicy::default(),
            status: None,
        }
    }

    pub fn with_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_status(mut self, status: &'a StatusBoard) -> Self {
        self.status = Some(status);
        self
    }

    /// Records still to render: first occurrence of each seat, minus the
    /// seats the checkpoint already holds. Order is preserved.
    pub fn pending_records(&self, records: Vec<EligibleRecord>) -> Vec<EligibleRecord> {
        pending_against(&self.checkpoint.load(), records)
    }

    /// Lay out every pending record into `sink` and serialise it.
    ///
    /// Any error discards the sink and puts the checkpoint back to the state
    /// it had when the run started, so a later run renders the same seats
    /// again. Clearing the checkpoint after the document is safely stored is
    /// the caller's job, as is restoring it when storing fails.
    pub fn assemble<S: DocumentSink>(
        &self,
        records: Vec<EligibleRecord>,
        context: &NarrativeContext,
        sink: S,
    ) -> Result<AssemblyOutcome, RenderError> {
        let started = Instant::now();
        let total = records.len();
        let snapshot = self.checkpoint.load();
        let pending = pending_against(&snapshot, records);
        let skipped = total - pending.len();

        if pending.is_empty() {
            log::info!(
                "No pending certificates, {} eligible record(s) already processed",
                skipped
            );
            return Ok(AssemblyOutcome::NothingPending { skipped });
        }

        log::info!(
            "Rendering {} certificate(s), skipping {}",
            pending.len(),
            skipped
        );
        let (seats, pages, document) = match self.render(&pending, context, sink) {
            Ok(rendered) => rendered,
            Err(e) => {
                if let Err(restore_err) = self.checkpoint.restore(snapshot) {
                    log::error!(
                        "Error restoring checkpoint {}: {}",
                        self.checkpoint.path().display(),
                        restore_err
                    );
                }
                return Err(e);
            }
        };
        log::info!(
            "Assembled {} certificate(s) on {} page(s) in {:.2?}",
            seats.len(),
            pages,
            started.elapsed()
        );

        Ok(AssemblyOutcome::Rendered {
            document,
            report: AssemblyReport {
                seats,
                skipped,
                pages,
            },
        })
    }

    fn render<S: DocumentSink>(
        &self,
        pending: &[EligibleRecord],
        context: &NarrativeContext,
        mut sink: S,
    ) -> Result<(Vec<SeatNo>, usize, Vec<u8>), RenderError> {
        let stage = Stage::in_progress(GENERATION_STAGE);
        self.checkpoint.record_stage(stage.clone());

        let mut seats = Vec::with_capacity(pending.len());
        for (index, record) in pending.iter().enumerate() {
            let position = slot_for(index);
            if position.opens_page() {
                sink.begin_page()?;
            }
            let slot = self.engine.layout_slot(record, context, position)?;
            sink.draw_slot(&slot)?;
            log::debug!(
                "Seat {} placed on page {} slot {}",
                record.seat_no(),
                position.page + 1,
                position.slot + 1
            );

            if self.policy == CheckpointPolicy::PerRecord {
                self.checkpoint.record(record.seat_no(), stage.clone());
            }
            metrics::CERTIFICATES_RENDERED.inc();
            seats.push(record.seat_no().clone());

            let done = index + 1;
            if done % PROGRESS_INTERVAL == 0 {
                if let Some(status) = self.status {
                    status.set(format!("Generated {done} of {} certificates", pending.len()));
                }
            }
        }

        let pages = sink.page_count();
        let document = sink.finish()?;
        Ok((seats, pages, document))
    }
}

fn pending_against(state: &CheckpointState, records: Vec<EligibleRecord>) -> Vec<EligibleRecord> {
    dedupe_by_seat(records)
        .into_iter()
        .filter(|record| !state.is_processed(record.seat_no()))
        .collect()
}

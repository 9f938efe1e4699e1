//! Checkpoint module - which seats already have a certificate, persisted
//! between runs so an interrupted batch can resume.

pub mod model;
pub mod store;


pub use model::{CheckpointPolicy, CheckpointState, Stage};
pub use store::CheckpointStore;

use thiserror::Error;

/// Failures while reading or writing the checkpoint file.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

//! Dataset module - reading, validating and reconciling the two exam exports.
//!
//! - `table` - in-memory rows and cells
//! - `spreadsheet` - workbook bytes to [`Table`]
//! - `validation` - required columns, file types and run parameters
//! - `models` - typed records derived from the exports
//! - `reconciler` - join, filter, dedupe, order and sequence

pub mod models;
pub mod reconciler;
pub mod spreadsheet;
pub mod table;
pub mod validation;


pub use models::{
    CandidateRecord, EligibleRecord, Gender, IdentityKey, NarrativeVariant, ResultRecord, SeatNo,
};
pub use reconciler::{dedupe_by_seat, reconcile, ReconciliationError};
pub use table::{Cell, Table};
pub use validation::{ValidationError, ValidationErrors};

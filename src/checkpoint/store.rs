use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::model::{CheckpointState, Stage};
use super::CheckpointError;
use crate::dataset::SeatNo;

/// File-backed checkpoint with an in-memory copy of the current state.
///
/// Writes go through a temporary file in the same directory and are renamed
/// into place, so readers never observe a half-written document. The file is
/// authoritative: progress whose write failed is only visible through
/// [`snapshot`](Self::snapshot) until the next [`load`](Self::load) replaces
/// it with what is on disk.
pub struct CheckpointStore {
    path: PathBuf,
    state: Mutex<CheckpointState>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = read_state(&path);
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the persisted state. A missing or unreadable file is the zero state.
    pub fn load(&self) -> CheckpointState {
        let state = read_state(&self.path);
        *self.state.lock() = state.clone();
        state
    }

    /// In-memory state, including progress whose write failed.
    pub fn snapshot(&self) -> CheckpointState {
        self.state.lock().clone()
    }

    /// Mark `seat` as processed and move to `stage`.
    ///
    /// Persistence failures are logged and otherwise ignored.
    pub fn record(&self, seat: &SeatNo, stage: Stage) {
        if let Err(e) = self.try_record(Some(seat), stage) {
            log::error!("Error writing checkpoint file {}: {}", self.path.display(), e);
        }
    }

    /// Update only the stage marker.
    pub fn record_stage(&self, stage: Stage) {
        if let Err(e) = self.try_record(None, stage) {
            log::error!("Error writing checkpoint file {}: {}", self.path.display(), e);
        }
    }

    /// Same as [`record`](Self::record) but reports the write error.
    pub fn try_record(&self, seat: Option<&SeatNo>, stage: Stage) -> Result<(), CheckpointError> {
        let mut state = self.state.lock();
        if let Some(seat) = seat {
            state.processed.insert(seat.clone());
        }
        state.stage = stage;
        write_state(&self.path, &state)
    }

    /// Put back a state taken earlier, persisting it. A zero state removes the file.
    pub fn restore(&self, snapshot: CheckpointState) -> Result<(), CheckpointError> {
        if snapshot.is_zero() {
            return self.clear();
        }
        let mut state = self.state.lock();
        *state = snapshot;
        write_state(&self.path, &state)
    }

    /// Remove the persisted checkpoint and reset to the zero state.
    pub fn clear(&self) -> Result<(), CheckpointError> {
        let mut state = self.state.lock();
        *state = CheckpointState::default();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Checkpoint {} cleared", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_state(path: &Path) -> CheckpointState {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return CheckpointState::default(),
        Err(e) => {
            log::warn!("Could not read checkpoint {}: {}", path.display(), e);
            return CheckpointState::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(state) => state,
        Err(e) => {
            log::warn!(
                "Ignoring unreadable checkpoint {}: {}",
                path.display(),
                e
            );
            CheckpointState::default()
        }
    }
}

fn write_state(path: &Path, state: &CheckpointState) -> Result<(), CheckpointError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let json = serde_json::to_vec(state)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&json)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

//! Process-wide status message polled by clients during a run.

use parking_lot::Mutex;

pub const IDLE_MESSAGE: &str = "Idle";

/// Last-writer-wins status string. Every read and write takes the lock.
#[derive(Debug)]
pub struct StatusBoard {
    message: Mutex<String>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            message: Mutex::new(IDLE_MESSAGE.to_string()),
        }
    }

    pub fn get(&self) -> String {
        self.message.lock().clone()
    }

    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("Status: {}", message);
        *self.message.lock() = message;
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_idle_and_keeps_last_write() {
        let board = StatusBoard::new();
        assert_eq!(board.get(), IDLE_MESSAGE);
        board.set("Processing request...");
        board.set("Completed");
        assert_eq!(board.get(), "Completed");
    }

    #[test]
    fn test_concurrent_writers_leave_a_whole_message() {
        let board = Arc::new(StatusBoard::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let board = Arc::clone(&board);
                thread::spawn(move || {
                    for _ in 0..100 {
                        board.set(format!("writer {i}"));
                        let _ = board.get();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let last = board.get();
        assert!(last.starts_with("writer "));
    }
}

//! Background ownership estimation.
//!
//! The estimator runs on its own thread against a copy of the board and
//! sends the result back over a channel. A task is stamped with the handle
//! and generation of the position it was started for; the owner compares the
//! stamp with the live position before applying a result, and drops it when
//! the position has moved on. Dropping or cancelling a task raises a flag the
//! worker checks between rounds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::debug;

use crate::board::Board;
use crate::estimator::{EstimatorConfig, estimate_territory_cancellable};
use crate::move_tree::PositionId;
use crate::position::BoardPosition;

#[derive(Debug)]
pub struct EstimationTask {
    position_id: PositionId,
    generation: u64,
    receiver: Receiver<Board>,
    cancel: Arc<AtomicBool>,
}

impl EstimationTask {
    /// Start estimating `position` (registered as `position_id`) in a background thread.
    pub fn spawn(position: &BoardPosition, position_id: PositionId, config: EstimatorConfig) -> Self {
        let board = position.board().clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let (tx, rx): (Sender<Board>, Receiver<Board>) = mpsc::channel();
        thread::spawn(move || {
            if let Some(estimate) = estimate_territory_cancellable(&board, &config, &flag) {
                let _ = tx.send(estimate);
            }
        });
        debug!(?position_id, generation = position.generation(), "estimation started");

        Self {
            position_id,
            generation: position.generation(),
            receiver: rx,
            cancel,
        }
    }

    pub fn position_id(&self) -> PositionId {
        self.position_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a result from this task still applies to the given position.
    pub fn is_current(&self, position_id: PositionId, generation: u64) -> bool {
        self.position_id == position_id && self.generation == generation
    }

    /// Non-blocking poll; `None` while the worker is still running.
    pub fn try_result(&self) -> Option<Board> {
        self.receiver.try_recv().ok()
    }

    /// Block until the worker finishes. `None` if it was cancelled.
    pub fn wait(self) -> Option<Board> {
        self.receiver.recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

impl Drop for EstimationTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

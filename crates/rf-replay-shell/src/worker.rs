//! The parser domain: one worker thread per active parse, reporting back
//! through a completion channel. See SPEC_FULL.md section 0 / spec
//! section 5.
//!
//! The presenter (`main`'s command loop) hands a file path to
//! [`spawn_parse`] and polls [`ParseHandle::poll`] rather than touching the
//! Dataset Store until a result arrives; it never calls `transmit` while a
//! parse is in flight (see [`crate::state::AppState`]).

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};

use rf_replay_core::{DatasetKey, DatasetKind, ModulationName, ModulationRegistry, Result, SignalData};

/// What a finished parse worker reports back: either the entries to
/// publish into the Dataset Store, or the error that aborted the parse.
/// The store is never touched from the worker thread itself (spec section
/// 3's ownership note); the presenter applies this on its own thread after
/// receiving it.
pub type ParseOutcome = Result<Vec<(DatasetKey, SignalData)>>;

/// A handle to an in-flight or finished parse.
pub struct ParseHandle {
    receiver: Receiver<ParseOutcome>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl ParseHandle {
    /// Non-blocking poll for a finished result. Returns `None` while the
    /// parse is still running.
    pub fn poll(&mut self) -> Option<ParseOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => {
                if let Some(join) = self.join.take() {
                    let _ = join.join();
                }
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if let Some(join) = self.join.take() {
                    let _ = join.join();
                }
                None
            }
        }
    }

    /// Blocks until the parse finishes.
    pub fn join(mut self) -> Option<ParseOutcome> {
        let outcome = self.receiver.recv().ok();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        outcome
    }
}

/// Spawns one worker thread that parses `path` as `kind` (passing
/// `modulation` through for the hierarchical-scientific format, which
/// reads a single modulation's slab) and reports the outcome on the
/// returned handle.
///
/// Parses are serialized by construction: the presenter refuses to spawn a
/// second parse while a [`ParseHandle`] from a prior call is still
/// unresolved (spec section 5, "at most one parser runs at a time").
pub fn spawn_parse(
    registry: std::sync::Arc<ModulationRegistry>,
    kind: DatasetKind,
    path: PathBuf,
    modulation: Option<ModulationName>,
) -> ParseHandle {
    let (sender, receiver) = std::sync::mpsc::channel();

    let join = std::thread::spawn(move || {
        ftlog::info!("parse worker started for {path:?} ({kind:?})");
        let outcome = rf_replay_core::parsers::load_entries(&registry, kind, &path, modulation);
        match &outcome {
            Ok(entries) => ftlog::info!("parse worker finished: {} entries", entries.len()),
            Err(e) => ftlog::warn!("parse worker failed: {e}"),
        }
        // The receiver may already be gone if the presenter dropped the
        // handle; that's not this thread's problem to report.
        let _ = sender.send(outcome);
    });

    ParseHandle { receiver, join: Some(join) }
}

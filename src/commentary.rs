//! Narrative commentary at phase transitions
//!
//! A `Commentator` turns a cue into a short line of text somewhere off the
//! simulation thread. The `CommentaryDesk` issues requests, polls for
//! answers once per frame, and falls back to a canned line on failure or
//! timeout. Only the newest request may change the displayed line.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::COMMENTARY_TIMEOUT;

/// Transition that triggers commentary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentaryCue {
    Start,
    GameOver,
    LevelClear,
}

impl CommentaryCue {
    /// Tag passed to text generators
    pub fn tag(self) -> &'static str {
        match self {
            CommentaryCue::Start => "start",
            CommentaryCue::GameOver => "game_over",
            CommentaryCue::LevelClear => "level_clear",
        }
    }

    /// Canned line used when no generator answers
    pub fn fallback(self) -> &'static str {
        match self {
            CommentaryCue::Start => "Engines hot. Mind the rocks, pilot.",
            CommentaryCue::GameOver => "Signal lost. The belt claims another.",
            CommentaryCue::LevelClear => "Sector clear. Deeper into the drift.",
        }
    }
}

/// One outstanding commentary request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentaryRequest {
    pub ticket: u64,
    pub cue: CommentaryCue,
    pub score: Option<u64>,
}

/// Why a commentator produced no text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentaryError {
    /// No generator configured or reachable
    Unavailable,
    /// Generator ran and failed
    Failed(String),
    /// Generator answered with nothing usable
    Empty,
}

impl fmt::Display for CommentaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "commentary unavailable"),
            Self::Failed(reason) => write!(f, "commentary failed: {reason}"),
            Self::Empty => write!(f, "commentary came back empty"),
        }
    }
}

impl std::error::Error for CommentaryError {}

/// Finished request: ticket plus outcome
pub type CommentaryReply = (u64, Result<String, CommentaryError>);

/// Non-blocking text generator
pub trait Commentator {
    /// Start work on a request; must return immediately
    fn request(&mut self, request: CommentaryRequest);
    /// Collect whatever has finished since the last poll
    fn poll(&mut self) -> Vec<CommentaryReply>;
}

/// Commentator with no generator behind it; every request fails
#[derive(Debug, Default)]
pub struct OfflineCommentator {
    pending: Vec<u64>,
}

impl OfflineCommentator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Commentator for OfflineCommentator {
    fn request(&mut self, request: CommentaryRequest) {
        self.pending.push(request.ticket);
    }

    fn poll(&mut self) -> Vec<CommentaryReply> {
        self.pending
            .drain(..)
            .map(|ticket| (ticket, Err(CommentaryError::Unavailable)))
            .collect()
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use threaded::ThreadedCommentator;

#[cfg(not(target_arch = "wasm32"))]
mod threaded {
    use std::sync::Arc;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::thread;

    use super::{CommentaryCue, CommentaryError, CommentaryReply, CommentaryRequest, Commentator};

    type Generator = dyn Fn(CommentaryCue, Option<u64>) -> Result<String, CommentaryError> + Send + Sync;

    /// Runs a (possibly slow) generator on a worker thread per request
    pub struct ThreadedCommentator {
        generator: Arc<Generator>,
        tx: Sender<CommentaryReply>,
        rx: Receiver<CommentaryReply>,
    }

    impl ThreadedCommentator {
        pub fn new<F>(generator: F) -> Self
        where
            F: Fn(CommentaryCue, Option<u64>) -> Result<String, CommentaryError> + Send + Sync + 'static,
        {
            let (tx, rx) = mpsc::channel();
            Self {
                generator: Arc::new(generator),
                tx,
                rx,
            }
        }
    }

    impl Commentator for ThreadedCommentator {
        fn request(&mut self, request: CommentaryRequest) {
            let generator = Arc::clone(&self.generator);
            let tx = self.tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("commentary-{}", request.ticket))
                .spawn(move || {
                    let result = generator(request.cue, request.score);
                    // Receiver gone means the game shut down; nothing to do
                    let _ = tx.send((request.ticket, result));
                });
            if let Err(e) = spawned {
                let _ = self
                    .tx
                    .send((request.ticket, Err(CommentaryError::Failed(e.to_string()))));
            }
        }

        fn poll(&mut self) -> Vec<CommentaryReply> {
            self.rx.try_iter().collect()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: u64,
    cue: CommentaryCue,
    waited: f32,
}

/// Owns the displayed commentary line
pub struct CommentaryDesk {
    commentator: Box<dyn Commentator>,
    next_ticket: u64,
    pending: Option<Pending>,
    line: String,
    timeout: f32,
}

impl CommentaryDesk {
    pub fn new(commentator: Box<dyn Commentator>) -> Self {
        Self {
            commentator,
            next_ticket: 1,
            pending: None,
            line: String::new(),
            timeout: COMMENTARY_TIMEOUT,
        }
    }

    /// Desk that always shows the canned lines
    pub fn offline() -> Self {
        Self::new(Box::new(OfflineCommentator::new()))
    }

    /// Ask for a line; supersedes any request still in flight
    pub fn announce(&mut self, cue: CommentaryCue, score: Option<u64>) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        if let Some(old) = self.pending.replace(Pending {
            ticket,
            cue,
            waited: 0.0,
        }) {
            log::debug!("Commentary #{} superseded by #{ticket}", old.ticket);
        }
        self.commentator.request(CommentaryRequest { ticket, cue, score });
        ticket
    }

    /// Apply finished replies and expire a request that took too long
    pub fn update(&mut self, dt: f32) {
        for (ticket, result) in self.commentator.poll() {
            let Some(pending) = self.pending.filter(|p| p.ticket == ticket) else {
                log::debug!("Dropping stale commentary #{ticket}");
                continue;
            };
            self.pending = None;
            match result.and_then(|text| {
                let text = text.trim();
                if text.is_empty() {
                    Err(CommentaryError::Empty)
                } else {
                    Ok(text.to_string())
                }
            }) {
                Ok(text) => self.line = text,
                Err(e) => {
                    log::warn!("{e}; using canned {} line", pending.cue.tag());
                    self.line = pending.cue.fallback().to_string();
                }
            }
        }

        if let Some(pending) = self.pending.as_mut() {
            pending.waited += dt.max(0.0);
            if pending.waited >= self.timeout {
                log::warn!("Commentary #{} timed out", pending.ticket);
                self.line = pending.cue.fallback().to_string();
                self.pending = None;
            }
        }
    }

    /// Currently displayed line (empty before the first announcement lands)
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Whether a request is still outstanding
    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }
}

impl fmt::Debug for CommentaryDesk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentaryDesk")
            .field("next_ticket", &self.next_ticket)
            .field("pending", &self.pending)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

//! Background level generation.
//!
//! The worker owns its request and builds the whole layout before sending
//! it, so the frame loop only ever sees a finished [`LevelLayout`]. The main
//! loop polls once per frame and never blocks.

use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

use tracing::debug;

use super::generator::{generate_with_retry, GenerationRequest, LevelLayout};
use super::LevelError;

pub type LevelResult = Result<LevelLayout, LevelError>;

/// A level being generated. Poll it each frame.
pub struct PendingLevel {
    level: u32,
    receiver: Option<Receiver<LevelResult>>,
    result: Option<LevelResult>,
}

impl PendingLevel {
    /// Generate on a named worker thread.
    pub fn spawn(request: GenerationRequest) -> Result<Self, LevelError> {
        let level = request.level;
        let (sender, receiver) = channel();
        thread::Builder::new()
            .name(format!("level-gen-{level}"))
            .spawn(move || {
                let result = generate_with_retry(&request);
                // The receiver may be gone if the session ended meanwhile.
                let _ = sender.send(result);
            })
            .map_err(|e| LevelError::WorkerSpawn(e.to_string()))?;
        debug!(level, "level worker started");
        Ok(Self {
            level,
            receiver: Some(receiver),
            result: None,
        })
    }

    /// Generate right away on the calling thread.
    pub fn inline(request: GenerationRequest) -> Self {
        Self {
            level: request.level,
            receiver: None,
            result: Some(generate_with_retry(&request)),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// The result once the worker has finished; `None` while it is running.
    /// Yields the result at most once.
    pub fn poll(&mut self) -> Option<LevelResult> {
        if self.result.is_none() {
            if let Some(receiver) = &self.receiver {
                match receiver.try_recv() {
                    Ok(result) => self.result = Some(result),
                    Err(TryRecvError::Empty) => return None,
                    Err(TryRecvError::Disconnected) => {
                        self.result = Some(Err(LevelError::WorkerDisconnected));
                    }
                }
            }
        }
        self.receiver = None;
        self.result.take()
    }

    /// Block until the worker finishes.
    pub fn wait(mut self) -> LevelResult {
        if let Some(result) = self.result.take() {
            return result;
        }
        match self.receiver.take() {
            Some(receiver) => receiver.recv().unwrap_or(Err(LevelError::WorkerDisconnected)),
            None => Err(LevelError::WorkerDisconnected),
        }
    }
}

impl std::fmt::Debug for PendingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLevel")
            .field("level", &self.level)
            .field("background", &self.receiver.is_some())
            .field("ready", &self.result.is_some())
            .finish()
    }
}

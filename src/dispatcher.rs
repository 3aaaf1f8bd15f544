//! Runs one completion request per activation on a fresh worker thread and posts the
//! outcome back to the UI thread as a [`Completion`] message.

use crossbeam_channel::Sender;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::gemini::{CompletionService, GeminiClient};
use crate::operation::Operation;

pub const ERROR_PREFIX: &str = "Erro técnico: ";

/// Outcome of a request, handed to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Success(String),
    Failure(String),
}

pub struct Dispatcher {
    service: Option<Arc<dyn CompletionService>>,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service: Some(service) }
    }

    /// A dispatcher that ignores every activation for the rest of the session.
    pub fn unavailable() -> Self {
        Self { service: None }
    }

    /// Builds the Gemini-backed dispatcher. A missing or rejected key is logged here,
    /// once, and leaves the dispatcher unavailable.
    pub fn from_config(cfg: &Config) -> Self {
        match GeminiClient::from_config(cfg) {
            Ok(client) => {
                info!("API ready with model: {}", client.model());
                Self::new(Arc::new(client))
            }
            Err(e) => {
                error!("API initialization failed, actions disabled for this session: {e:#}");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.service.is_some()
    }

    /// Spawns the worker. `wake` runs after the message is posted so the UI loop notices it.
    /// Returns false without spawning when the dispatcher is unavailable.
    pub fn dispatch<W>(&self, op: Operation, text: &str, reply: Sender<Completion>, wake: W) -> bool
    where
        W: FnOnce() + Send + 'static,
    {
        let Some(service) = self.service.clone() else {
            return false;
        };
        let prompt = op.build_prompt(text);
        info!("dispatching {op} request ({} chars)", text.chars().count());

        let spawned = thread::Builder::new()
            .name("completion-worker".to_string())
            .spawn(move || {
                let completion = match service.submit(&prompt) {
                    Ok(out) => {
                        info!("{op} request succeeded ({} chars)", out.chars().count());
                        Completion::Success(out)
                    }
                    Err(e) => {
                        warn!("{op} request failed: {e:#}");
                        Completion::Failure(format!("{ERROR_PREFIX}{e:#}"))
                    }
                };
                if reply.send(completion).is_err() {
                    warn!("UI went away before {op} request finished");
                }
                wake();
            });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                error!("failed to spawn completion worker: {e}");
                false
            }
        }
    }
}

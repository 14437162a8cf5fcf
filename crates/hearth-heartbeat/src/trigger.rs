//! Proactive-turn trigger boundary.
//!
//! The scheduler only knows how to call [`ProactiveTrigger::notify`].  How the
//! payload turns into agent work (injection into a live session, a background
//! session, …) belongs to the host that supplies the trigger.

use async_trait::async_trait;
use hearth_types::ProactivePrompt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

/// Failure reported by a trigger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Proactive trigger failed: {0}")]
pub struct TriggerError(pub String);

/// Capability injected into the scheduler to start a proactive turn.
#[async_trait]
pub trait ProactiveTrigger: Send + Sync {
    /// Start a proactive turn for the task-file `payload`.
    async fn notify(&self, payload: &str) -> Result<(), TriggerError>;
}

/// Trigger that only logs the rendered prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrigger;

#[async_trait]
impl ProactiveTrigger for LogTrigger {
    async fn notify(&self, payload: &str) -> Result<(), TriggerError> {
        let prompt = ProactivePrompt::new(payload);
        info!(prompt_id = %prompt.id, prompt = %prompt.prompt, "proactive turn requested");
        Ok(())
    }
}

/// Trigger that queues a [`ProactivePrompt`] for the host to pick up.
///
/// Never blocks: a full queue or a dropped receiver is reported as a
/// [`TriggerError`].
#[derive(Debug, Clone)]
pub struct ChannelTrigger {
    tx: mpsc::Sender<ProactivePrompt>,
}

impl ChannelTrigger {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProactivePrompt>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProactiveTrigger for ChannelTrigger {
    async fn notify(&self, payload: &str) -> Result<(), TriggerError> {
        let prompt = ProactivePrompt::new(payload);
        let id = prompt.id;
        self.tx.try_send(prompt).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                TriggerError("proactive prompt queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                TriggerError("proactive prompt receiver was dropped".to_string())
            }
        })?;
        info!(prompt_id = %id, "proactive prompt queued");
        Ok(())
    }
}

//! `hearth-heartbeat` – periodic attention for the agent.
//!
//! A recurring timer inspects a user-authored task file and, when it holds
//! actionable lines, hands its content to an injected proactive-turn trigger.
//!
//! # Modules
//!
//! - [`task_file`] – [`TaskFile`][task_file::TaskFile]: bootstraps
//!   `heartbeat.md` and decides whether it contains active (non-blank,
//!   non-`#`) lines.
//! - [`trigger`] – [`ProactiveTrigger`][trigger::ProactiveTrigger]: the
//!   one-method boundary into the agent runtime, plus a logging and a
//!   channel-backed implementation.
//! - [`scheduler`] – [`HeartbeatScheduler`][scheduler::HeartbeatScheduler]:
//!   the idempotent start/stop timer with a re-entrancy guard so checks never
//!   overlap.  Check failures are logged and swallowed.

pub mod scheduler;
pub mod task_file;
pub mod trigger;

pub use scheduler::{CheckError, CheckOutcome, DEFAULT_INTERVAL, HeartbeatScheduler};
pub use task_file::{TaskFile, TaskFileError};
pub use trigger::{ChannelTrigger, LogTrigger, ProactiveTrigger, TriggerError};

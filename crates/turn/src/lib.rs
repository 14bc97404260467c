//! The Turn Orchestrator (§4.4): drains the ingress queue one message at a
//! time, fans a turn out across its addressed characters in order, and is
//! the sole producer onto `SentenceQ`. At most one turn is ever in flight
//! because `run` processes that queue strictly sequentially on one task.

pub mod error;
pub mod orchestrator;

pub use error::TurnError;
pub use orchestrator::{InterruptHandle, ModelSettingsHandle, StateHandle, TurnOrchestrator};

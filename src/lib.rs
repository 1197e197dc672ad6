pub mod agent;
pub mod attachment;
pub mod clipboard;
pub mod config;
pub mod errors;
pub mod host;
pub mod interpreter;
pub mod models;
pub mod preamble;
pub mod repl;
pub mod service;
pub mod session;
pub mod speech;

pub use errors::AssistantError;
pub use service::{AssistantService, TurnOutcome};
pub use session::AssistantSession;

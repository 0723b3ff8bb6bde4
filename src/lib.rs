pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod persona;
pub mod scheduler;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use error::{GatewayError, SendFailure};
pub use gateway::{ChatBackend, ChatReply, HttpGateway};
pub use health::{backoff_delay, HealthMonitor, Readiness};
pub use persona::{Persona, PERSONAS};
pub use scheduler::DelayedTask;
pub use session::{ChatSession, SessionEvent};
pub use state::{ChatMessage, ChatRole, HistoryEntry, Safety, SessionState};

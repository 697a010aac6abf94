//! The Steward agent loop.
//!
//! Orchestrates one run of the reason-act cycle: exchange the
//! conversation with the reasoning service, execute the requested
//! operations through the rate limiter and confirmation gate, feed the
//! results back, repeat until a plain-text reply or a hard cap.

pub mod confirm;
pub mod events;
pub mod rate_limit;
pub mod reasoning;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use confirm::ConfirmationRequest;
pub use events::LoopEvent;
pub use rate_limit::RateLimiter;
pub use reasoning::{ExchangeError, ReasoningClient};
pub use runner::{AgentLoop, AgentRun, DEFAULT_SYSTEM_PROMPT};

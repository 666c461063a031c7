//! Verification pipeline.
//!
//! - [`aggregate`] - merge and rank evidence from several providers
//! - [`prompts`] - model prompts
//! - [`reasoner`] - grounded verdicts from claim + evidence
//! - [`orchestrator`] - the routing state machine

pub mod aggregate;
pub mod orchestrator;
pub mod prompts;
pub mod reasoner;

pub use aggregate::merge;
pub use orchestrator::{
    is_sufficient, Degradation, Orchestrator, VerificationOutcome, VerificationState,
};
pub use prompts::{format_retry_prompt, format_verify_prompt, VERIFY_SYSTEM_PROMPT};
pub use reasoner::{parse_reply, ParsedReply, ReasonerReply, Stance, StanceEntry, VerdictReasoner};

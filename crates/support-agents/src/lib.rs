//! Agent pipeline for automated customer-support ticket processing.
//!
//! An incoming ticket flows through five fixed stages (triage, research,
//! policy, response, escalation), each a structured-output call against an
//! OpenAI-compatible endpoint. The stages share one
//! [`state::ProcessingState`] and leave one audit [`state::TraceRecord`]
//! per executed stage. The terminal escalation stage averages the upstream
//! confidence scores and decides whether the ticket needs a human; a fatal
//! stage failure aborts the run instead, and the caller marks the ticket
//! for mandatory review.

pub mod agents;
pub mod config;
pub mod contracts;
pub mod generation;
pub mod orchestrator;
pub mod prompts;
pub mod state;
pub mod tools;

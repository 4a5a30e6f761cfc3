//! Core business logic for the awards service.
//!
//! The voting rules live here: the phase state machine
//! ([`PhaseService`]), the vote recorder ([`VoteService`]) and the results
//! aggregator ([`ResultsService`]), plus the thin admin services around them.

pub mod services;

pub use services::*;

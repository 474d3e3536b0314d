//! Core of an interactive chess coaching client: keeps evaluation,
//! recommendation, move grading, and coaching chat synchronized with a
//! live board position while talking to a remote analysis service.
//!
//! The [`session::CoachSession`] coordinator owns all mutable state; the
//! modules below are its parts.

pub mod analysis;
pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod params;
pub mod position;
pub mod session;
pub mod view;

pub use session::CoachSession;

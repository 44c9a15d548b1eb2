//! Interview practice: rounds of generated questions, scored answers, and a
//! summary report merged into the whiteboard.

pub mod evaluation;
pub mod handlers;
pub mod models;
pub mod questions;
pub mod round;
pub mod scoring;

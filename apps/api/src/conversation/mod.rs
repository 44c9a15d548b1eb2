pub mod handlers;
pub mod hints;
pub mod models;
pub mod orchestrator;
pub mod transcripts;

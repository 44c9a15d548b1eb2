// Whiteboard: the per-session structured summary.
// Extraction (LLM, JSON-only) → merge (pure) → persistence (debounced pipeline).

pub mod extractor;
pub mod handlers;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod prompts;

// The user-facing actions: analyze, clear, export. Each is an independent
// request handler with no shared state beyond the export file.

pub mod analysis;
pub mod export;

pub use analysis::{
    analyze_input, clear_inputs, AnalysisOutcome, AnalysisRequest, ClearedFields, FileSource,
};
pub use export::{export_result, ExportError};

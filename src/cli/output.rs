//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::OrchestrationError;

/// Map an engine error to a single CLI line.
/// Failed batches also list the siblings that had completed, for diagnostics.
pub fn map_error(e: &OrchestrationError) -> String {
    let mut message = format!("Error: {}", e);
    let partial = e.partial_results();
    if !partial.is_empty() {
        let labels: Vec<&str> = partial.iter().map(|p| p.label.as_str()).collect();
        message.push_str(&format!(" [completed before abort: {}]", labels.join(", ")));
    }
    message
}

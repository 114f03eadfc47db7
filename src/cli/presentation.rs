//! CLI presentation: render command results as terminal text.

use crate::error::OrchestrationError;
use crate::execution::ExecutionReport;
use crate::fanout::FanOutReport;
use crate::refine::{LoopOutcome, RefinementOutcome};
use crate::router::RouteOutcome;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_fan_out(report: &FanOutReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading("Parallel generation")
    ));
    out.push_str(&format!(
        "  Completed {} request(s) in {:.2} seconds\n\n",
        report.responses.len(),
        report.elapsed.as_secs_f64()
    ));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Response"]);
    for (i, response) in report.responses.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), response.clone()]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!("{}\n\n", format_section_heading("Synthesis")));
    out.push_str(&report.synthesis);
    out
}

/// Raw per-task results as JSON, then the combined text
pub fn format_plan(report: &ExecutionReport, combined: &str) -> Result<String, OrchestrationError> {
    let raw = serde_json::to_string_pretty(report).map_err(|e| {
        OrchestrationError::Config(format!("Failed to render execution report: {}", e))
    })?;
    Ok(format!(
        "{}\n\n{}\n\n{}\n\n{}",
        format_section_heading("Raw execution results"),
        raw,
        format_section_heading("Final output"),
        combined
    ))
}

pub fn format_refinement(outcome: &RefinementOutcome) -> String {
    let mut out = String::new();
    for record in &outcome.iterations {
        out.push_str(&format!(
            "{}\n\n",
            format_section_heading(&format!("Iteration {}", record.iteration))
        ));
        out.push_str(&format!("{}\n\n", record.candidate));
        let status = if record.evaluation.passed() {
            format!("{}", "PASS".green())
        } else {
            format!("{}", "FAIL".red())
        };
        out.push_str(&format!("  Evaluation: {}\n", status));
        out.push_str(&format!("  Feedback: {}\n\n", record.evaluation.feedback));
    }
    let verdict = match outcome.outcome {
        LoopOutcome::Passed => "Passed evaluation",
        LoopOutcome::Exhausted => "Maximum iterations reached",
    };
    out.push_str(&format!("{}\n\n", format_section_heading(verdict)));
    out.push_str(&outcome.artifact);
    out
}

pub fn format_route(outcome: &RouteOutcome) -> String {
    let mut out = format!(
        "{}\n\n  Category: {}\n  Reasoning: {}\n\n",
        format_section_heading("Routing decision"),
        outcome.decision.category,
        outcome.decision.reasoning
    );
    match &outcome.output {
        Some(report) => {
            out.push_str(&format!(
                "{}\n\n",
                format_section_heading(&format!("{} report", outcome.decision.category))
            ));
            out.push_str(report);
        }
        None => out.push_str(&format!(
            "{}",
            "No handler for this category. No further action taken.".yellow()
        )),
    }
    out
}

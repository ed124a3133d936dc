//! Embedded prompts
//!
//! These are compiled into the library from .pmt files at build time.

use tracing::debug;

pub const INTENT: &str = include_str!("../../prompts/intent.pmt");
pub const CLARIFY: &str = include_str!("../../prompts/clarify.pmt");
pub const RESEARCH: &str = include_str!("../../prompts/research.pmt");
pub const TASK_HELP: &str = include_str!("../../prompts/task-help.pmt");
pub const REPORT: &str = include_str!("../../prompts/report.pmt");
pub const TOOL_PROMPT: &str = include_str!("../../prompts/tool-prompt.pmt");
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");
pub const EVALUATION: &str = include_str!("../../prompts/evaluation.pmt");
pub const BRIEFING: &str = include_str!("../../prompts/briefing.pmt");

/// Names of every embedded template
pub const NAMES: &[&str] = &[
    "intent",
    "clarify",
    "research",
    "task-help",
    "report",
    "tool-prompt",
    "plan",
    "evaluation",
    "briefing",
];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let template = match name {
        "intent" => INTENT,
        "clarify" => CLARIFY,
        "research" => RESEARCH,
        "task-help" => TASK_HELP,
        "report" => REPORT,
        "tool-prompt" => TOOL_PROMPT,
        "plan" => PLAN,
        "evaluation" => EVALUATION,
        "briefing" => BRIEFING,
        _ => {
            debug!("get_embedded: no match found");
            return None;
        }
    };
    Some(template)
}

//! Work item type dispatch
//!
//! Research, report and idea items share the report template with different
//! framing; tool-prompt items use their own template.

use serde_json::json;

use crate::domain::{AIWorkItem, WorkItemType};
use crate::error::{PipelineError, PipelineResult};
use crate::llm::CompletionRequest;
use crate::prompts::PromptLibrary;

const REPORT_TEMPERATURE: f32 = 0.5;
const TOOL_PROMPT_TEMPERATURE: f32 = 0.3;

/// System-prompt framing for report-style items
pub fn framing(item_type: WorkItemType) -> &'static str {
    match item_type {
        WorkItemType::Research => {
            "Research the topic below. Summarize what is known, separate facts from open questions, and list where to verify each claim."
        }
        WorkItemType::Report => "Write a structured report on the topic below with a short summary first and practical takeaways last.",
        WorkItemType::IdeaGeneration => {
            "Generate a varied list of concrete ideas for the topic below, each with one line on why it could work."
        }
        WorkItemType::ToolPrompt => "",
    }
}

/// Build the completion request for a work item
pub fn build_request(prompts: &PromptLibrary, item: &AIWorkItem) -> PipelineResult<CompletionRequest> {
    let context = json!({
        "title": item.title,
        "instructions": item.instructions,
        "framing": framing(item.item_type),
        "context": "",
    });

    let (template, temperature) = match item.item_type {
        WorkItemType::ToolPrompt => ("tool-prompt", TOOL_PROMPT_TEMPERATURE),
        WorkItemType::Research | WorkItemType::Report | WorkItemType::IdeaGeneration => {
            ("report", REPORT_TEMPERATURE)
        }
    };

    let pair = prompts.render(template, &context).map_err(PipelineError::prompt)?;
    Ok(CompletionRequest::new(pair.system, pair.user).with_temperature(temperature))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> PromptLibrary {
        PromptLibrary::embedded_only()
    }

    #[test]
    fn test_report_style_items_share_template() {
        let research = AIWorkItem::new("g", WorkItemType::Research, "Competitor pricing");
        let ideas = AIWorkItem::new("g", WorkItemType::IdeaGeneration, "Launch ideas").with_instructions("cheap ones");

        let a = build_request(&prompts(), &research).unwrap();
        let b = build_request(&prompts(), &ideas).unwrap();

        assert!(a.system_prompt.contains("Research the topic below"));
        assert!(b.system_prompt.contains("list of concrete ideas"));
        assert!(a.user_prompt.contains("Title: Competitor pricing"));
        assert!(b.user_prompt.contains("cheap ones"));
    }

    #[test]
    fn test_tool_prompt_uses_own_template() {
        let item = AIWorkItem::new("g", WorkItemType::ToolPrompt, "Logo brief").with_instructions("for an image model");
        let request = build_request(&prompts(), &item).unwrap();

        assert!(request.system_prompt.contains("paste into another AI tool"));
        assert!(request.user_prompt.contains("Tool prompt for: Logo brief"));
        assert!(request.user_prompt.contains("for an image model"));
    }
}

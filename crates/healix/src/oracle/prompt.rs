//! Prompt text sent to the oracle.

use super::SuggestionQuery;

const REPLY_SHAPE: &str = r#"{"target_locator": "string", "action": "click|fill|scroll", "confidence": 0.0-1.0, "rationale": "string"}"#;

/// Render the single structured request for one failure
#[must_use]
pub fn build_prompt(query: &SuggestionQuery) -> String {
    let mut prompt = format!(
        "You are a QA automation agent. A UI test failed to use the locator: {}\n",
        query.signature
    );
    if !query.error_context.is_empty() {
        prompt.push_str(&format!("Failure: {}\n", query.error_context));
    }
    if !query.page_errors.is_empty() {
        prompt.push_str(&format!(
            "The page currently shows: {}\n",
            query.page_errors.join(", ")
        ));
    }
    prompt.push_str("Available elements:\n");
    prompt.push_str(query.context.as_str());
    prompt.push_str("\n\nTask: find the CSS selector for the element the test meant to use.\n");
    prompt.push_str("Constraints: return one valid CSS selector; prefer ids and names.\n");
    prompt.push_str("Return exactly one JSON object and nothing else: ");
    prompt.push_str(REPLY_SHAPE);
    prompt
}

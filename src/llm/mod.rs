//! LLM provider client and prompt templates

mod client;
pub mod prompts;

pub use client::LlmClient;
pub use client::LlmCompletion;

/// Strip a Markdown code fence wrapping a JSON completion, if present.
///
/// Models regularly wrap strict-JSON answers in ```json fences even when told
/// not to; the parser tolerates that one deviation.
#[must_use]
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_untouched() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), r#"{"a": 1}"#);
    }

    #[test]
    fn test_fenced_json_unwrapped() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
    }
}

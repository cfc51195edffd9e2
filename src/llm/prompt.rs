use crate::error::{InsightsError, Result};

/// Standard system prompt shared by the agents.
pub fn create_prompt_template(role: &str, instructions: &str) -> String {
    format!(
        "You are a {} for a Retail Insights Assistant.\n\n{}\n\nBe precise, analytical, and focus on providing actionable insights.\n",
        role,
        instructions.trim()
    )
}

/// Return the outermost `{...}` block of a model reply.
///
/// Handles replies wrapped in markdown fences or surrounded by prose.
pub fn extract_json_object(text: &str) -> Result<&str> {
    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => Ok(&text[start..=end]),
        _ => Err(InsightsError::Parse(format!(
            "No JSON object found in model response: {}",
            truncate_chars(text.trim(), 200)
        ))),
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_mentions_role() {
        let prompt = create_prompt_template("SQL Expert", "  Write SQL.  ");
        assert!(prompt.starts_with("You are a SQL Expert for a Retail Insights Assistant."));
        assert!(prompt.contains("\n\nWrite SQL.\n\n"));
    }

    #[test]
    fn test_extract_from_fenced_reply() {
        let reply = "```json\n{\"sql_query\": \"SELECT 1\", \"entities\": {\"a\": 1}}\n```";
        assert_eq!(
            extract_json_object(reply).unwrap(),
            "{\"sql_query\": \"SELECT 1\", \"entities\": {\"a\": 1}}"
        );
    }

    #[test]
    fn test_extract_with_prose() {
        let reply = "Sure! Here you go: {\"a\": 1} Hope that helps.";
        assert_eq!(extract_json_object(reply).unwrap(), "{\"a\": 1}");
        assert!(extract_json_object("no json here").is_err());
        assert!(extract_json_object("} backwards {").is_err());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("₹₹₹₹", 2), "₹₹");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}

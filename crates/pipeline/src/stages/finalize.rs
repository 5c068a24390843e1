//! Final cleanup of the working summary.

use std::sync::LazyLock;

use regex::Regex;

use precis_chunker::classify::ensure_terminal_punctuation;

use crate::config::OutputMode;

#[expect(clippy::expect_used)]
static FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("hardcoded regex pattern is valid")
});

/// Remove markdown code-fence markers (with or without a language tag).
pub fn strip_code_fences(text: &str) -> String {
    FENCE_REGEX.replace_all(text, "").trim().to_string()
}

/// Strip fences and guarantee the text ends in terminal punctuation.
///
/// Structured output that parses as JSON is left as it is.
pub fn finalize(text: &str, output: OutputMode) -> String {
    let cleaned = strip_code_fences(text);

    let is_json = output == OutputMode::Structured
        && serde_json::from_str::<serde_json::Value>(&cleaned).is_ok();
    if is_json {
        cleaned
    } else {
        ensure_terminal_punctuation(&cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_fences() {
        let text = "```markdown\n# Summary\n\nBody text.\n```";
        assert_eq!(strip_code_fences(text), "# Summary\n\nBody text.");
        assert_eq!(strip_code_fences("```\nplain\n```"), "plain");
    }

    #[test]
    fn test_finalize_appends_period() {
        assert_eq!(finalize("No period", OutputMode::Prose), "No period.");
        assert_eq!(finalize("Has one.", OutputMode::Prose), "Has one.");
        assert_eq!(finalize("```\nFenced\n```", OutputMode::Prose), "Fenced.");
    }

    #[test]
    fn test_finalize_keeps_valid_json() {
        let json = "```json\n{\"executive_summary\": \"x\"}\n```";
        assert_eq!(
            finalize(json, OutputMode::Structured),
            "{\"executive_summary\": \"x\"}"
        );
        assert_eq!(finalize("not json", OutputMode::Structured), "not json.");
    }
}

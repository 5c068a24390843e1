//! Instructions sent to the completion service at each stage.

use precis_completion::Message;

use crate::config::OutputMode;

const CHUNK_INSTRUCTION: &str = "\
You summarize one section of a longer document.
Write a concise summary of the section below using only the information it contains.
Keep names, numbers, dates, obligations and deadlines exactly as written.
Do not add commentary, introductions or information from outside the section.
End with a complete sentence.";

const MERGE_INSTRUCTION: &str = "\
You combine partial summaries of consecutive sections of one document.
Produce one coherent overview using only the material provided.
Keep the original order of topics, remove repetition across sections, and keep every distinct fact.
Format the result as clean Markdown without code fences.
End with a complete sentence.";

const STRUCTURED_MERGE_INSTRUCTION: &str = "\
You combine partial summaries of consecutive sections of one regulatory document.
Produce a single JSON object with the keys regulatory_context, requirements, impact_and_risk, \
ambiguities, executive_summary, key_obligations_table, responsibility_matrix and visual_aids.
Use only the material provided. Output the JSON object only, without code fences or commentary.";

const CONTINUATION_INSTRUCTION: &str = "\
The text below was cut off before it was finished.
Begin your reply with the last word of the text, completing it if it was cut off,
then continue writing from there. Do not repeat anything before that word.
Finish the thought and end with a complete sentence.";

const POLISH_INSTRUCTION: &str = "\
Rewrite the summary below to improve phrasing, flow and formatting only.
Preserve every fact, name, number and section. Do not add or remove content.
Format the result as clean Markdown without code fences.";

/// Messages for summarizing chunk `index` of `total`.
pub fn chunk_messages(content: &str, index: usize, total: usize) -> Vec<Message> {
    vec![
        Message::system(format!(
            "{CHUNK_INSTRUCTION}\nThis is section {} of {}.",
            index.saturating_add(1),
            total
        )),
        Message::user(content),
    ]
}

/// Messages for merging ordered summaries into one.
pub fn merge_messages(summaries: &[&str], separator: &str, output: OutputMode) -> Vec<Message> {
    let instruction = match output {
        OutputMode::Prose => MERGE_INSTRUCTION,
        OutputMode::Structured => STRUCTURED_MERGE_INSTRUCTION,
    };
    vec![
        Message::system(instruction),
        Message::user(summaries.join(separator)),
    ]
}

/// Messages asking the service to continue truncated text.
pub fn continuation_messages(text: &str) -> Vec<Message> {
    vec![
        Message::system(CONTINUATION_INSTRUCTION),
        Message::user(text),
    ]
}

/// Messages for the phrasing-only rewrite.
pub fn polish_messages(text: &str) -> Vec<Message> {
    vec![Message::system(POLISH_INSTRUCTION), Message::user(text)]
}

#[cfg(test)]
mod tests {
    use precis_completion::Role;

    use super::*;

    #[test]
    fn test_chunk_messages_are_one_based() {
        let messages = chunk_messages("Body.", 0, 3);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.ends_with("section 1 of 3."));
        assert_eq!(messages[1].content, "Body.");
    }

    #[test]
    fn test_merge_messages_keep_order() {
        let messages = merge_messages(&["A.", "B.", "C."], "\n\n", OutputMode::Prose);
        assert_eq!(messages[1].content, "A.\n\nB.\n\nC.");
    }

    #[test]
    fn test_structured_merge_asks_for_json() {
        let messages = merge_messages(&["A."], "\n\n", OutputMode::Structured);
        assert!(messages[0].content.contains("JSON"));
    }
}

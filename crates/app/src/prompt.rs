//! Prompt assembly for completions and chat.

/// Default number of lines before the cursor sent to the model.
pub const DEFAULT_CONTEXT_LINES: usize = 20;

/// The last `lines` lines of `text`.
#[must_use]
pub fn last_lines(text: &str, lines: usize) -> &str {
    if lines == 0 {
        return "";
    }
    let mut seen = 0;
    for (offset, _) in text.rmatch_indices('\n') {
        // A trailing newline does not start a new line.
        if offset + 1 == text.len() {
            continue;
        }
        seen += 1;
        if seen == lines {
            return text.get(offset + 1..).unwrap_or(text);
        }
    }
    text
}

/// Inline-completion prompt.
///
/// Instructions sit inside `<<SYS>>` markers. Retrieved project code goes in
/// `<code_from_other_files>` and the typed window in `<code_before_cursor>`.
#[must_use]
pub fn completion_prompt(
    system_message: &str,
    document: &str,
    context_window: &str,
    project_context: &str,
) -> String {
    let mut prompt = format!(
        "<<SYS>>\n{system_message}\nThe code is written in this file {document}\n<</SYS>>\n\n"
    );
    if !project_context.trim().is_empty() {
        prompt.push_str(&format!(
            "Relevant code from other files:\n<code_from_other_files>\n{project_context}\n</code_from_other_files>\n\n"
        ));
    }
    prompt.push_str(&format!(
        "Complete the following code based on the context:\n<code_before_cursor>\n{context_window}\n</code_before_cursor>"
    ));
    prompt
}

/// System message carrying retrieved project code into a chat turn.
#[must_use]
pub fn chat_context_message(project_context: &str) -> String {
    format!("<code_from_other_files>\n{project_context}\n</code_from_other_files>")
}

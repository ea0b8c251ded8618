//! Cleanup of raw model completions.

const FENCE: &str = "```";

/// Body of the first fenced code block in `raw`, or the trimmed text.
///
/// The info string after the opening fence (`rust`, `ts`, ...) is dropped.
/// An unterminated fence is treated as plain text.
#[must_use]
pub fn extract_code(raw: &str) -> &str {
    let Some((_, after_open)) = raw.split_once(FENCE) else {
        return raw.trim();
    };
    let body = after_open.split_once('\n').map_or("", |(_, body)| body);
    match body.split_once(FENCE) {
        Some((code, _)) => code.trim_end_matches(['\n', '\r']),
        None => raw.trim(),
    }
}

/// `output` with the longest common prefix shared with `typed` removed.
///
/// Comparison is character by character, so the split never lands inside a
/// multi-byte character.
#[must_use]
pub fn strip_overlap<'a>(typed: &str, output: &'a str) -> &'a str {
    let shared: usize = typed
        .chars()
        .zip(output.chars())
        .take_while(|(left, right)| left == right)
        .map(|(_, ch)| ch.len_utf8())
        .sum();
    output.get(shared..).unwrap_or(output)
}

/// Extract the code from `raw` and drop what is already typed.
#[must_use]
pub fn postprocess(typed: &str, raw: &str) -> String {
    strip_overlap(typed, extract_code(raw)).to_owned()
}

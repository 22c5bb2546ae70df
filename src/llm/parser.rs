//! Response parsing for LLM outputs.
//!
//! Models asked for "SQL only" still tend to wrap it in a markdown fence.
//! The fenced body is what gets classified and executed.

/// Extracts the SQL statement text from a generation reply.
///
/// Looks for, in order:
/// - a ```` ```sql ```` block
/// - a bare ```` ``` ```` block
///
/// The first matching block wins. With no block, the trimmed reply is
/// returned unchanged.
pub fn extract_sql(reply: &str) -> String {
    extract_code_block(reply, "sql")
        .or_else(|| extract_code_block(reply, ""))
        .map(|sql| sql.trim().to_string())
        .unwrap_or_else(|| reply.trim().to_string())
}

/// Extracts the body of the first fence tagged with `lang`.
///
/// An empty `lang` matches only fences without a language tag.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find("```") {
        let fence = search_from + offset;
        let after_fence = fence + 3;
        let line_end = text[after_fence..].find('\n').map(|i| after_fence + i)?;
        let tag = text[after_fence..line_end].trim();

        let content_start = line_end + 1;
        let content_len = text[content_start..].find("```")?;

        if tag.eq_ignore_ascii_case(lang) {
            return Some(text[content_start..content_start + content_len].to_string());
        }

        // Skip past this block's closing fence.
        search_from = content_start + content_len + 3;
    }

    None
}

/// Clean user-authored rich text using the ammonia library.
///
/// Whitelist-based: safe formatting tags (like <b>, <p>) survive while
/// <script>, <iframe> and event-handler attributes are stripped. Question
/// content and feedback are rendered as HTML by the web console.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Cleans an optional field, mapping blank results to `None`.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(clean_html)
        .filter(|cleaned| !cleaned.trim().is_empty())
}

/// Clean HTML content using the ammonia library.
///
/// Applied to authored test, question and option text before it is stored.
/// Safe inline tags (like <b>, <code>) survive; <script>, <iframe> and event
/// attributes are stripped, content of <script> included.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes and trims; `None` when nothing remains.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(|s| clean_html(s.trim()))
        .filter(|s| !s.is_empty())
}

//! Prompt normalization.
//!
//! Every lookup and write goes through [`normalize_prompt`] so that case and
//! whitespace variants of a prompt land on the same key, while any other
//! difference (punctuation included) keeps prompts apart.

/// Inclusive code point ranges of the Unicode `Cf` (format) general category.
const FORMAT_RANGES: &[(u32, u32)] = &[
    (0x00AD, 0x00AD),
    (0x0600, 0x0605),
    (0x061C, 0x061C),
    (0x06DD, 0x06DD),
    (0x070F, 0x070F),
    (0x0890, 0x0891),
    (0x08E2, 0x08E2),
    (0x180E, 0x180E),
    (0x200B, 0x200F),
    (0x202A, 0x202E),
    (0x2060, 0x2064),
    (0x2066, 0x206F),
    (0xFEFF, 0xFEFF),
    (0xFFF9, 0xFFFB),
    (0x110BD, 0x110BD),
    (0x110CD, 0x110CD),
    (0x13430, 0x1343F),
    (0x1BCA0, 0x1BCA3),
    (0x1D173, 0x1D17A),
    (0xE0001, 0xE0001),
    (0xE0020, 0xE007F),
];

/// Returns `true` for invisible format characters such as zero-width spaces,
/// bidi marks and the byte-order mark.
pub fn is_format_char(c: char) -> bool {
    let cp = c as u32;
    FORMAT_RANGES
        .iter()
        .any(|&(lo, hi)| cp >= lo && cp <= hi)
}

/// Normalize a raw prompt: drop format characters, lowercase, and collapse
/// every whitespace run to a single space (trimming both ends).
///
/// ```
/// use evicta::cache::normalize_prompt;
/// assert_eq!(normalize_prompt("  Hello   WORLD  "), "hello world");
/// ```
pub fn normalize_prompt(prompt: &str) -> String {
    let visible: String = prompt.chars().filter(|c| !is_format_char(*c)).collect();
    collapse_whitespace(&visible.to_lowercase())
}

/// Whitespace for collapsing purposes: Unicode `White_Space` plus the ASCII
/// information separators U+001C..=U+001F.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split(is_separator)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

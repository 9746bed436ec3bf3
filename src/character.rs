//! Display width classification for characters

use unicode_width::UnicodeWidthChar;

/// Number of terminal cells a character occupies.
///
/// East-Asian Wide and Fullwidth codepoints take two cells; everything else,
/// including control and zero-width characters, takes one so that every
/// character keeps a visible, addressable cell.
#[must_use]
pub fn display_width(ch: char) -> usize {
    match UnicodeWidthChar::width(ch) {
        Some(2) => 2,
        _ => 1,
    }
}

/// Whether the character is drawn across two cells
#[must_use]
pub fn is_wide(ch: char) -> bool {
    display_width(ch) == 2
}

/// Total display width of a string
#[must_use]
pub fn str_width(s: &str) -> usize {
    s.chars().map(display_width).sum()
}

#[cfg(test)]
#[path = "character_tests.rs"]
mod tests;

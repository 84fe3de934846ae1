use unicode_general_category::{GeneralCategory, get_general_category};

/// Strip every character that is neither printable nor whitespace.
///
/// Order and all remaining characters are preserved exactly, so the
/// function is idempotent.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|&ch| keep_char(ch)).collect()
}

fn keep_char(ch: char) -> bool {
    ch.is_whitespace() || is_printable(ch)
}

fn is_printable(ch: char) -> bool {
    !matches!(
        get_general_category(ch),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Unassigned
            | GeneralCategory::PrivateUse
            | GeneralCategory::Surrogate
    )
}

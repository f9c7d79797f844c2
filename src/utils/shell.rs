//! POSIX shell helpers for commands sent to `sh -c` or over ssh.

/// Quotes `value` as a single shell word.
///
/// Words made only of safe characters are returned unchanged, everything else
/// is wrapped in single quotes with embedded quotes written as `'\''`.
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | ',' | '@' | '%' | '+'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

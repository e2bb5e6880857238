//! Removal of the interpreter's command echo.

use crate::domain::models::CR;

/// Strip the echoed `command` from a raw interpreter response.
///
/// The echo is the command text followed by a carriage return. A command
/// that already ends in CR or LF is echoed as written, so the echo is always
/// the exact text that was transmitted. Its first occurrence is cut out
/// wherever it sits, since stray bytes from an earlier partial read may
/// precede it, and any leading CR/LF run left behind is trimmed. Without an
/// echo the response passes through untouched.
pub fn clean(raw: &str, command: &str) -> String {
    let mut echo = command.to_string();
    if !echo.ends_with(is_line_break) {
        echo.push(CR);
    }

    match raw.find(&echo) {
        Some(pos) => {
            let mut cleaned = String::with_capacity(raw.len() - echo.len());
            cleaned.push_str(&raw[..pos]);
            cleaned.push_str(&raw[pos + echo.len()..]);
            cleaned.trim_start_matches(is_line_break).to_string()
        }
        None => raw.to_string(),
    }
}

fn is_line_break(c: char) -> bool {
    c == '\r' || c == '\n'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_leading_echo() {
        assert_eq!(clean("ATZ\rOK\r>", "ATZ"), "OK\r>");
    }

    #[test]
    fn test_strips_echo_after_stray_bytes() {
        assert_eq!(clean(">ATZ\rOK\r>", "ATZ"), ">OK\r>");
    }

    #[test]
    fn test_trims_line_breaks_after_echo() {
        assert_eq!(clean("010C\r\r\n41 0C 1A F8\r\r>", "010C"), "41 0C 1A F8\r\r>");
    }

    #[test]
    fn test_missing_echo_passes_through() {
        assert_eq!(clean("\rOK\r>", "ATE0"), "\rOK\r>");
        assert_eq!(clean("NO DATA\r>", "0100"), "NO DATA\r>");
    }

    #[test]
    fn test_only_first_occurrence_removed() {
        assert_eq!(clean("AT\rAT\r>", "AT"), "AT\r>");
    }

    #[test]
    fn test_lf_terminated_command_matches_lf_echo() {
        assert_eq!(clean("010C\n41 0C 1A F8\r>", "010C\n"), "41 0C 1A F8\r>");
        // A CR echo does not match the LF the command was sent with
        assert_eq!(clean("010C\r41 0C\r>", "010C\n"), "010C\r41 0C\r>");
    }

    #[test]
    fn test_command_with_line_ending() {
        assert_eq!(clean("ATI\rELM327 v1.5\r\r>", "ATI\r"), "ELM327 v1.5\r\r>");
    }
}

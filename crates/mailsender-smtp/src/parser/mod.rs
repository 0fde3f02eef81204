//! SMTP reply line parsing.
//!
//! Reply lines look like `250-First line`, `250 Last line`: a three-digit
//! code, a separator (`-` for continuation, space for the final line) and
//! free text. With `ENHANCEDSTATUSCODES` the text starts with an RFC 3463
//! code such as `5.7.8`.

use crate::error::{Error, Result};
use crate::types::{EnhancedCode, LineInfo, ReplyCode};

/// Length of the `NNN-` / `NNN ` prefix.
const PREFIX_LEN: usize = 4;

/// Parses the reply code from the first three characters of a line.
///
/// # Errors
///
/// Returns an error if the line does not start with three digits.
pub fn parse_reply_code(line: &str) -> Result<ReplyCode> {
    line.get(..3)
        .and_then(ReplyCode::parse)
        .ok_or_else(|| Error::Protocol(format!("Invalid reply code: {line}")))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` in the fourth column for continuation and a
/// space for the last line. A bare code (`250`) also ends the reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    match line.as_bytes().get(3) {
        Some(b' ') => true,
        Some(_) => false,
        None => line.len() == 3,
    }
}

/// Inspects one reply line.
///
/// # Errors
///
/// Returns an error if the line does not start with a reply code.
pub fn inspect_line(line: &str) -> Result<LineInfo> {
    Ok(LineInfo {
        code: parse_reply_code(line)?,
        is_last: is_last_reply_line(line),
    })
}

/// Returns everything after the four-character reply prefix.
#[must_use]
pub fn reply_payload(line: &str) -> &str {
    line.get(PREFIX_LEN..).unwrap_or_default()
}

/// Returns the enhanced status code of a reply line.
///
/// Only meaningful when the server advertised `ENHANCEDSTATUSCODES`;
/// otherwise returns `None`.
#[must_use]
pub fn parse_enhanced_code(line: &str, enhanced_supported: bool) -> Option<EnhancedCode> {
    if !enhanced_supported {
        return None;
    }
    reply_payload(line)
        .split_whitespace()
        .next()
        .and_then(EnhancedCode::parse)
}

/// Returns the human-readable text of a reply line.
///
/// With enhanced status codes the leading code token and the whitespace
/// after it are skipped. Lines that carry no code keep their whole text.
#[must_use]
pub fn parse_reply_text(line: &str, enhanced_supported: bool) -> &str {
    let payload = reply_payload(line);
    if parse_enhanced_code(line, enhanced_supported).is_none() {
        return payload;
    }
    payload
        .trim_start()
        .split_once(char::is_whitespace)
        .map_or("", |(_, text)| text.trim_start())
}

/// Builds the error for a rejected reply.
///
/// The code and enhanced code come from the last line; the message joins
/// the text of every line with runs of whitespace collapsed.
#[must_use]
pub fn response_error(lines: &[String], enhanced_supported: bool) -> Error {
    let Some(last) = lines.last() else {
        return Error::Protocol("Empty reply".into());
    };

    let code = match parse_reply_code(last) {
        Ok(code) => code.as_u16(),
        Err(e) => return e,
    };

    let joined = lines
        .iter()
        .map(|line| parse_reply_text(line, enhanced_supported))
        .collect::<Vec<_>>()
        .join(" ");
    let message = joined.split_whitespace().collect::<Vec<_>>().join(" ");

    Error::Smtp {
        code,
        enhanced: parse_enhanced_code(last, enhanced_supported),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(!is_last_reply_line("250-Continuing"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("25"));
        assert!(!is_last_reply_line(""));
    }

    #[test]
    fn test_parse_reply_code() {
        assert_eq!(parse_reply_code("220 hi").unwrap(), ReplyCode::SERVICE_READY);
        assert_eq!(parse_reply_code("250-EXT1").unwrap(), ReplyCode::OK);
        assert!(parse_reply_code("ABC OK").is_err());
        assert!(parse_reply_code("25").is_err());
        assert!(parse_reply_code("2é5 x").is_err());
    }

    #[test]
    fn test_inspect_line() {
        let info = inspect_line("250-SIZE 1000").unwrap();
        assert_eq!(info.code, ReplyCode::OK);
        assert!(!info.is_last);
        assert!(inspect_line("250 OK").unwrap().is_last);
    }

    #[test]
    fn test_reply_payload() {
        assert_eq!(reply_payload("250 OK"), "OK");
        assert_eq!(reply_payload("250-SIZE 1000"), "SIZE 1000");
        assert_eq!(reply_payload("250"), "");
    }

    #[test]
    fn test_enhanced_code_requires_advertisement() {
        assert_eq!(parse_enhanced_code("550 5.1.1 No such user", false), None);
        assert_eq!(
            parse_enhanced_code("550 5.1.1 No such user", true),
            EnhancedCode::parse("5.1.1")
        );
        assert_eq!(parse_enhanced_code("250 OK", true), None);
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(
            parse_reply_text("550 5.1.1 No such user", true),
            "No such user"
        );
        assert_eq!(
            parse_reply_text("550 5.1.1 No such user", false),
            "5.1.1 No such user"
        );
        assert_eq!(parse_reply_text("250 OK", true), "OK");
        assert_eq!(parse_reply_text("250 2.0.0", true), "");
    }

    #[test]
    fn test_response_error_joins_lines() {
        let err = response_error(
            &lines(&["550-5.7.1 Relaying   denied", "550 5.7.1 see  policy"]),
            true,
        );
        match err {
            Error::Smtp {
                code,
                enhanced,
                message,
            } => {
                assert_eq!(code, 550);
                assert_eq!(enhanced, EnhancedCode::parse("5.7.1"));
                assert_eq!(message, "Relaying denied see policy");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_response_error_without_enhanced_codes() {
        let err = response_error(&lines(&["535 5.7.8 bad credentials"]), false);
        match err {
            Error::Smtp {
                code,
                enhanced,
                message,
            } => {
                assert_eq!(code, 535);
                assert_eq!(enhanced, None);
                assert_eq!(message, "5.7.8 bad credentials");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_response_error_empty() {
        assert!(matches!(response_error(&[], false), Error::Protocol(_)));
    }

}

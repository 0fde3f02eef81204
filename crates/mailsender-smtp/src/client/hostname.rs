//! Client name for HELO/EHLO.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Used when the machine has no fully-qualified name.
const LOOPBACK_LITERAL: &str = "[127.0.0.1]";

/// Returns the local host name in a form fit for HELO/EHLO.
#[must_use]
pub fn local_hostname() -> String {
    normalize_hostname(&gethostname::gethostname().to_string_lossy())
}

/// Normalizes a host name for HELO/EHLO (RFC 5321 section 4.1.4).
///
/// Names without a dot become the loopback literal and IPv4 addresses are
/// wrapped in brackets.
#[must_use]
pub fn normalize_hostname(host: &str) -> String {
    if !host.contains('.') {
        LOOPBACK_LITERAL.to_string()
    } else if host.parse::<Ipv4Addr>().is_ok() {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

/// Checks that a HELO/EHLO name is a single token.
///
/// # Errors
///
/// Returns [`Error::InvalidHostname`] if the name is empty or contains
/// whitespace or control characters.
pub fn validate_hostname(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidHostname("Host name cannot be empty".into()));
    }
    if let Some(c) = name.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidHostname(format!(
            "Host name contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_is_kept() {
        assert_eq!(normalize_hostname("mail.example.com"), "mail.example.com");
    }

    #[test]
    fn short_name_becomes_loopback() {
        assert_eq!(normalize_hostname("laptop"), "[127.0.0.1]");
        assert_eq!(normalize_hostname(""), "[127.0.0.1]");
    }

    #[test]
    fn ipv4_is_bracketed() {
        assert_eq!(normalize_hostname("192.168.1.1"), "[192.168.1.1]");
    }

    #[test]
    fn local_hostname_is_usable() {
        let name = local_hostname();
        assert!(!name.is_empty());
        assert!(!name.contains(char::is_whitespace));
    }

    #[test]
    fn hostname_with_line_break_is_rejected() {
        assert!(matches!(
            validate_hostname("a.example.com\r\nRSET"),
            Err(Error::InvalidHostname(_))
        ));
        assert!(matches!(
            validate_hostname("a.example.com RSET"),
            Err(Error::InvalidHostname(_))
        ));
        assert!(matches!(validate_hostname(""), Err(Error::InvalidHostname(_))));
    }

    #[test]
    fn plain_names_and_literals_are_accepted() {
        assert!(validate_hostname("mail.example.com").is_ok());
        assert!(validate_hostname("[127.0.0.1]").is_ok());
    }
}

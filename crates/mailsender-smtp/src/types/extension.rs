//! SMTP extension types.

/// One extension advertised in an EHLO reply: `NAME [PARAMS...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Extension {
    /// Leading keyword, exactly as advertised.
    pub name: String,
    /// Remaining whitespace-separated tokens.
    pub params: Vec<String>,
}

impl Extension {
    /// Parses an extension line (reply code prefix already removed).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default().to_string();
        let params = parts.map(str::to_string).collect();
        Self { name, params }
    }
}

/// Extensions from the last successful EHLO, in advertisement order.
///
/// Rebuilt on every EHLO and never mutated in between.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: Vec<Extension>,
}

impl ExtensionSet {
    /// Builds the set from extension lines (reply code prefix already removed).
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = lines
            .into_iter()
            .map(|line| Extension::parse(line.as_ref()))
            .filter(|ext| !ext.name.is_empty())
            .collect();
        Self { extensions }
    }

    /// Looks up an extension by exact, case-sensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.name == name)
    }

    /// Checks if the server advertised an extension.
    #[must_use]
    pub fn has_extension(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the `SIZE` limit in bytes, or 0 when absent (unbounded).
    #[must_use]
    pub fn data_size_limit(&self) -> u64 {
        self.get("SIZE")
            .and_then(|ext| ext.params.first())
            .and_then(|size| size.parse().ok())
            .unwrap_or(0)
    }

    /// Returns the upper-cased mechanism names following `AUTH`.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.get("AUTH")
            .map(|ext| ext.params.iter().map(|m| m.to_uppercase()).collect())
            .unwrap_or_default()
    }

    /// Checks if a mechanism appears in the `AUTH` advertisement.
    #[must_use]
    pub fn supports_auth(&self, mechanism: AuthMechanism) -> bool {
        self.auth_mechanisms()
            .iter()
            .any(|name| name == mechanism.as_str())
    }

    /// Iterates over the extensions in advertisement order.
    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter()
    }

    /// Returns the number of extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns true when nothing was advertised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication (RFC 4616)
    Plain,
    /// LOGIN - legacy plaintext
    Login,
    /// CRAM-MD5 - challenge-response
    CramMd5,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

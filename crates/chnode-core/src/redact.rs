//! Credential scrubbing for externally observable text
//!
//! Credentials travel as Basic auth and ClickHouse happily echoes user
//! names back in error bodies, so every error string built by the
//! transport and the shapers goes through a [`Redactor`] first.

use crate::Credentials;

/// Replacement for every secret occurrence
pub const REDACTED: &str = "***";

/// Maximum number of characters kept in a body excerpt
pub const EXCERPT_LIMIT: usize = 500;

/// Replaces literal secret substrings with [`REDACTED`]
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Build a redactor from arbitrary secrets; empty strings are ignored
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        // Longest first so a secret containing another is replaced whole.
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    /// Redactor for the username and password of a credential set
    pub fn for_credentials(credentials: &Credentials) -> Self {
        Self::new([credentials.username.as_str(), credentials.password.as_str()])
    }

    /// Replace every occurrence of every secret
    pub fn redact(&self, text: &str) -> String {
        let mut output = text.to_string();
        for secret in &self.secrets {
            if output.contains(secret.as_str()) {
                output = output.replace(secret.as_str(), REDACTED);
            }
        }
        output
    }

    /// Redacted excerpt of at most [`EXCERPT_LIMIT`] characters
    pub fn excerpt(&self, text: &str) -> String {
        self.excerpt_with_limit(text, EXCERPT_LIMIT)
    }

    /// Redacted excerpt truncated to `max_chars`, suffixed with `...` when cut
    ///
    /// Redaction runs before truncation so a secret straddling the cut
    /// cannot leave a visible prefix behind.
    pub fn excerpt_with_limit(&self, text: &str, max_chars: usize) -> String {
        let redacted = self.redact(text);
        match redacted.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &redacted[..cut]),
            None => redacted,
        }
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

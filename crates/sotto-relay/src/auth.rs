//! Authentication capability.
//!
//! The relay does not issue or validate credentials itself; it only needs
//! "given a token, hand me a verified identity". Magic-link issuance and
//! token signing live in an external collaborator behind this trait.

use std::collections::HashMap;

use sotto_shared::types::Identity;

/// Resolves a bearer token to a verified identity.
pub trait Authenticator: Send + Sync {
    fn verify(&self, token: &str) -> Option<Identity>;
}

/// Fixed token -> identity map, configured at startup.
/// Suitable for development and tests; production deployments plug in a
/// real token verifier.
#[derive(Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens }
    }

    /// Parse a comma-separated `token=identity` spec, e.g.
    /// `s3cret=alice@example.org,t0ken=bob@example.org`.
    /// Malformed entries are skipped with a warning.
    pub fn from_spec(spec: &str) -> Self {
        let mut tokens = HashMap::new();
        for entry in spec.split(',').filter(|e| !e.trim().is_empty()) {
            match entry.split_once('=') {
                Some((token, identity)) if !token.trim().is_empty() && !identity.trim().is_empty() => {
                    tokens.insert(
                        token.trim().to_string(),
                        Identity::from(identity.trim()),
                    );
                }
                _ => {
                    tracing::warn!(entry = %entry, "skipping malformed auth token entry");
                }
            }
        }
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn verify(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_known_token() {
        let auth =
            StaticTokenAuthenticator::from_spec("s3cret=alice@example.org,t0ken=bob@example.org");
        assert_eq!(auth.len(), 2);
        assert_eq!(
            auth.verify("s3cret"),
            Some(Identity::from("alice@example.org"))
        );
        assert_eq!(auth.verify("nope"), None);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let auth = StaticTokenAuthenticator::from_spec("broken,=x,y=,ok=carol@example.org");
        assert_eq!(auth.len(), 1);
        assert_eq!(
            auth.verify("ok"),
            Some(Identity::from("carol@example.org"))
        );
    }

    #[test]
    fn test_empty_spec() {
        let auth = StaticTokenAuthenticator::from_spec("");
        assert!(auth.is_empty());
    }
}

//! Artifact identifier for a filesystem source.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Alias;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::path::clean;

/// Name used for sources without an alias.
pub const FALLBACK_NAME: &str = "fs-source";

/// Number of hex characters kept from the digest.
const ID_LENGTH: usize = 16;

/// Content-derived identifier of a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds an ID from a hex digest, truncated to the ID length.
    fn from_digest(hex_digest: &str) -> Self {
        Self(hex_digest.chars().take(ID_LENGTH).collect())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the source ID from its alias.
///
/// With an alias the ID depends only on `name@version`. Without one, the
/// fixed fallback token is hashed instead and a [`Diagnostic::MissingAlias`]
/// is reported.
pub fn derive_artifact_id(alias: &Alias, diagnostics: &dyn DiagnosticSink) -> ArtifactId {
    let info = if alias.is_empty() {
        diagnostics.report(Diagnostic::MissingAlias);
        FALLBACK_NAME.to_string()
    } else {
        format!("{}@{}", alias.name, alias.version)
    };

    let digest = Sha256::digest(clean(&info).as_bytes());
    ArtifactId::from_digest(&hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;

    #[test]
    fn same_alias_same_id() {
        let sink = RecordingSink::new();
        let alias = Alias::new("example-fs-source", "1.0.0");
        let first = derive_artifact_id(&alias, &sink);
        let second = derive_artifact_id(&alias, &sink);

        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 16);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(sink.is_empty());
    }

    #[test]
    fn different_aliases_differ() {
        let sink = RecordingSink::new();
        let a = derive_artifact_id(&Alias::new("app", "1.0.0"), &sink);
        let b = derive_artifact_id(&Alias::new("app", "1.0.1"), &sink);
        let c = derive_artifact_id(&Alias::new("other", "1.0.0"), &sink);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn empty_alias_uses_fallback_and_warns() {
        let sink = RecordingSink::new();
        let first = derive_artifact_id(&Alias::default(), &sink);
        let second = derive_artifact_id(&Alias::default(), &sink);

        assert_eq!(first, second);
        let expected = hex::encode(Sha256::digest(b"fs-source"));
        assert_eq!(first.as_str(), &expected[..16]);
        assert_eq!(sink.events(), vec![Diagnostic::MissingAlias, Diagnostic::MissingAlias]);
    }

    #[test]
    fn alias_hashes_name_at_version() {
        let sink = RecordingSink::new();
        let id = derive_artifact_id(&Alias::new("app", "2.0"), &sink);
        let expected = hex::encode(Sha256::digest(b"app@2.0"));
        assert_eq!(id.as_str(), &expected[..16]);
    }
}

use serde::Serialize;

use crate::tree::RefId;

/// A resolved search result.
///
/// `real_path` is where the content lives; `access_path` is how the caller
/// reached it. The two differ when the request went through a symlink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    real_path: String,
    access_path: String,
    reference: RefId,
}

impl Location {
    pub fn new(real_path: impl Into<String>, access_path: impl Into<String>, reference: RefId) -> Self {
        Self {
            real_path: real_path.into(),
            access_path: access_path.into(),
            reference,
        }
    }

    /// Location reached directly by its own path.
    pub fn direct(path: impl Into<String>, reference: RefId) -> Self {
        let path = path.into();
        Self::new(path.clone(), path, reference)
    }

    #[inline]
    pub fn real_path(&self) -> &str {
        &self.real_path
    }

    #[inline]
    pub fn access_path(&self) -> &str {
        &self.access_path
    }

    #[inline]
    pub fn reference(&self) -> RefId {
        self.reference
    }
}

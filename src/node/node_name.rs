use thiserror::Error;

use crate::storage::StorePrefix;

/// A Zarr hierarchy node name.
///
/// See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#node-names>.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeName(String);

/// An invalid node name.
#[derive(Debug, Error)]
#[error("invalid node name {0}")]
pub struct NodeNameError(String);

/// Combining mark blocks permitted in node names alongside letters and digits.
fn is_combining_mark(c: char) -> bool {
    matches!(
        u32::from(c),
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

impl NodeName {
    /// Create a new Zarr node name from `name`.
    ///
    /// # Errors
    /// Returns [`NodeNameError`] if `name` is not valid according to [`NodeName::validate`()].
    pub fn new(name: &str) -> Result<Self, NodeNameError> {
        if Self::validate(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(NodeNameError(name.to_string()))
        }
    }

    /// Create a new Zarr node name from `name` without validation.
    ///
    /// # Safety
    /// `name` is not validated, so this can result in an invalid node name.
    #[must_use]
    pub unsafe fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The root node.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Extracts a string slice containing the node name `String`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a node name according to the following rules from the specification:
    /// - The root node does not have a name and is the empty string "". Otherwise,
    /// - must not be the empty string (""),
    /// - must not be a string composed only of period characters, e.g. "." or "..",
    /// - must not start with the reserved prefix "__", and
    /// - must be composed of Unicode letters, marks, and digits, plus ".", "_", and "-".
    #[must_use]
    pub fn validate(node_name: &str) -> bool {
        node_name.is_empty()
            || (!node_name.starts_with("__")
                && !node_name.replace('.', "").is_empty()
                && node_name.chars().all(|c| {
                    c.is_alphanumeric() || is_combining_mark(c) || matches!(c, '.' | '_' | '-')
                }))
    }

    /// Indicates if a node has the root node name ("").
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&StorePrefix> for NodeName {
    fn from(prefix: &StorePrefix) -> Self {
        let name = prefix
            .as_str()
            .strip_suffix('/')
            .expect("a store prefix must end with /")
            .split('/')
            .next_back()
            .expect("an empty string to split returns a single \"\" element")
            .to_string();
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name_validity() {
        assert!(NodeName::new("a").is_ok());
        assert!(NodeName::new("baz").is_ok());
        assert!(NodeName::new("1.0").is_ok());
        assert!(NodeName::new("µs").is_ok());
        assert!(NodeName::new("Đà_Lạt").is_ok());
        assert!(NodeName::new("東京").is_ok());
        assert!(NodeName::new("a-b_c.d").is_ok());

        assert!(NodeName::new(".").is_err());
        assert!(NodeName::new("..").is_err());
        assert!(NodeName::new("...").is_err());
        assert!(NodeName::new("__name").is_err());
        assert!(NodeName::new("a/b").is_err());
        assert!(NodeName::new("a b").is_err());
    }

    #[test]
    fn node_name_root() {
        assert!(NodeName::root().is_root());
        assert!(!NodeName::new("a").unwrap().is_root());
    }
}

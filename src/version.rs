//! Version information.

/// A string representation of the crate version.
///
/// Matches the `CARGO_PKG_VERSION`.
#[must_use]
pub const fn version_str() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version() {
        assert!(!version_str().is_empty());
    }
}

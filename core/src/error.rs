//! Errors raised by the engine.

use crate::vnode::Child;

/// Result alias used across the engine.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised while rendering or patching.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A value matched none of the recognized virtual-tree shapes.
    ///
    /// Aborts the current render or patch call. Detached work built so far is
    /// discarded; nodes already mounted elsewhere are untouched.
    #[error("invalid virtual tree: {0:?}")]
    InvalidTree(Child),
    /// A component handle could not reach its runtime, either because the
    /// runtime was dropped or because a render pass is already running.
    #[error("the reconciler is not available")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_tree_carries_the_value() {
        let err = Error::InvalidTree(Child::List(Vec::new()));
        assert_eq!(err.to_string(), "invalid virtual tree: List([])");
    }
}

//! Token-based authorization for delete and metadata reads
//!
//! Objects carry an optional read/write token in their metadata. Whether a
//! caller may act on an object is decided by an [`AuthorizationStrategy`],
//! so the matching rules live in one place instead of being re-derived per
//! operation.

/// Operation being authorized against a stored token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Deleting an object
    Delete,
    /// Reading an object's metadata
    Head,
}

/// Decides whether a caller-supplied token may perform an operation on an
/// object with the given stored token.
pub trait AuthorizationStrategy: Send + Sync {
    fn authorize(&self, stored: Option<&str>, caller: Option<&str>, operation: Operation) -> bool;
}

/// Default strategy matching the stored metadata token against the caller's.
///
/// The rules differ per operation:
/// - `Delete`: an object without a stored token is open to any caller;
///   otherwise the tokens must match.
/// - `Head`: strict equality, where both sides being absent counts as equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMetadataStrategy;

impl AuthorizationStrategy for TokenMetadataStrategy {
    fn authorize(&self, stored: Option<&str>, caller: Option<&str>, operation: Operation) -> bool {
        match operation {
            Operation::Delete => match stored {
                None => true,
                Some(_) => stored == caller,
            },
            Operation::Head => stored == caller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_open_object_allows_any_caller() {
        let strategy = TokenMetadataStrategy;
        assert!(strategy.authorize(None, None, Operation::Delete));
        assert!(strategy.authorize(None, Some("anything"), Operation::Delete));
    }

    #[test]
    fn test_delete_protected_object_requires_matching_token() {
        let strategy = TokenMetadataStrategy;
        assert!(strategy.authorize(Some("secret"), Some("secret"), Operation::Delete));
        assert!(!strategy.authorize(Some("secret"), Some("other"), Operation::Delete));
        assert!(!strategy.authorize(Some("secret"), None, Operation::Delete));
    }

    #[test]
    fn test_head_requires_strict_equality() {
        let strategy = TokenMetadataStrategy;
        assert!(strategy.authorize(Some("secret"), Some("secret"), Operation::Head));
        assert!(!strategy.authorize(Some("secret"), Some("other"), Operation::Head));
        assert!(!strategy.authorize(Some("secret"), None, Operation::Head));
        // An open object is only readable by a caller presenting no token
        assert!(strategy.authorize(None, None, Operation::Head));
        assert!(!strategy.authorize(None, Some("anything"), Operation::Head));
    }
}

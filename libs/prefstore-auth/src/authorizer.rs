use crate::{context::SecurityContext, errors::AuthError};

/// Owner-only access: the caller may touch `target_user`'s data only if it
/// is that user.
///
/// # Errors
/// `AuthError::Forbidden` when the subject and the target differ.
pub fn authorize_owner(ctx: &SecurityContext, target_user: &str) -> Result<(), AuthError> {
    if ctx.subject() == target_user {
        return Ok(());
    }
    tracing::warn!(
        subject = ctx.subject(),
        target_user,
        "access denied: subject does not own the resource"
    );
    Err(AuthError::Forbidden)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn owner_is_allowed() {
        let ctx = SecurityContext::new("alice");
        assert!(authorize_owner(&ctx, "alice").is_ok());
    }

    #[test]
    fn other_user_is_forbidden() {
        let ctx = SecurityContext::new("alice");
        assert_eq!(authorize_owner(&ctx, "bob"), Err(AuthError::Forbidden));
    }

    #[test]
    fn comparison_is_exact() {
        let ctx = SecurityContext::new("Alice");
        assert_eq!(authorize_owner(&ctx, "alice"), Err(AuthError::Forbidden));
        assert_eq!(authorize_owner(&ctx, "Alice "), Err(AuthError::Forbidden));
    }
}

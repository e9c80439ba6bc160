//! Role gate, layered after session resolution.
//!
//! A pure predicate over the already-resolved user; it never touches
//! tokens or the credential store.

use super::errors::AuthErrorKind;
use crate::db::{User, UserRole};

/// Require the user to hold the given role. Admins satisfy any
/// requirement.
pub fn require_role(user: &User, role: UserRole) -> Result<(), AuthErrorKind> {
    if user.role == role || user.role == UserRole::Admin {
        Ok(())
    } else {
        Err(AuthErrorKind::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: UserRole) -> User {
        User {
            id: 1,
            uuid: "uuid-1".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            password_hash: "h".to_string(),
            role,
            refresh_token: None,
        }
    }

    #[test]
    fn test_user_role_cannot_pass_admin_gate() {
        let user = user_with_role(UserRole::User);
        assert!(matches!(
            require_role(&user, UserRole::Admin),
            Err(AuthErrorKind::Forbidden)
        ));
    }

    #[test]
    fn test_admin_passes_both_gates() {
        let admin = user_with_role(UserRole::Admin);
        assert!(require_role(&admin, UserRole::Admin).is_ok());
        assert!(require_role(&admin, UserRole::User).is_ok());
    }

    #[test]
    fn test_user_passes_user_gate() {
        let user = user_with_role(UserRole::User);
        assert!(require_role(&user, UserRole::User).is_ok());
    }
}

//! Authorization decisions. Pure functions of the principal, the resource owner and the roles a
//! route admits; nothing here touches the store.

use tracing::warn;
use uuid::Uuid;

pub use crate::database::models::Role;
use crate::error::ApiError;

/// The authenticated caller. Lives for one request and is passed to handlers explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    RoleAllowed,
    RoleNotAllowed,
    Owner,
    Admin,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthDecision {
    pub allow: bool,
    pub reason: Reason,
}

impl AuthDecision {
    fn allow(reason: Reason) -> Self {
        Self { allow: true, reason }
    }

    fn deny(reason: Reason) -> Self {
        Self { allow: false, reason }
    }
}

/// Role gate: the principal's role must be one of `allowed`.
pub fn authorize_role(principal: &Principal, allowed: &[Role]) -> AuthDecision {
    if allowed.contains(&principal.role) {
        AuthDecision::allow(Reason::RoleAllowed)
    } else {
        AuthDecision::deny(Reason::RoleNotAllowed)
    }
}

/// Ownership gate: the principal owns the resource, or is an admin.
/// A resource without a recorded owner is only reachable by admins.
pub fn authorize_owner(principal: &Principal, owner: Option<Uuid>) -> AuthDecision {
    if owner == Some(principal.id) {
        AuthDecision::allow(Reason::Owner)
    } else if principal.is_admin() {
        AuthDecision::allow(Reason::Admin)
    } else {
        AuthDecision::deny(Reason::NotOwner)
    }
}

/// Both gates; the role gate is consulted first when `allowed` is given.
pub fn authorize(principal: &Principal, owner: Option<Uuid>, allowed: Option<&[Role]>) -> AuthDecision {
    if let Some(allowed) = allowed {
        let decision = authorize_role(principal, allowed);
        if !decision.allow {
            return decision;
        }
    }
    authorize_owner(principal, owner)
}

/// Role gate as a request outcome: 403 when the role is not admitted.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), ApiError> {
    if authorize_role(principal, allowed).allow {
        return Ok(());
    }
    warn!("Role {} denied for user {}", principal.role, principal.id);
    Err(ApiError::forbidden(format!(
        "User role {} is not authorized to access this route",
        principal.role
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUTATORS: &[Role] = &[Role::Publisher, Role::Admin];

    fn principal(role: Role) -> Principal {
        Principal { id: Uuid::new_v4(), role }
    }

    #[test]
    fn owner_is_allowed_regardless_of_role() {
        for role in [Role::User, Role::Publisher, Role::Admin] {
            let p = principal(role);
            assert!(authorize_owner(&p, Some(p.id)).allow);
            assert_eq!(authorize_owner(&p, Some(p.id)).reason, Reason::Owner);
        }
    }

    #[test]
    fn admin_is_allowed_regardless_of_owner() {
        let admin = principal(Role::Admin);
        assert_eq!(authorize_owner(&admin, Some(Uuid::new_v4())), AuthDecision::allow(Reason::Admin));
        assert!(authorize_owner(&admin, None).allow);
    }

    #[test]
    fn everyone_else_is_denied() {
        for role in [Role::User, Role::Publisher] {
            let decision = authorize_owner(&principal(role), Some(Uuid::new_v4()));
            assert_eq!(decision, AuthDecision::deny(Reason::NotOwner));
        }
        assert!(!authorize_owner(&principal(Role::Publisher), None).allow);
    }

    #[test]
    fn role_gate_checks_membership() {
        assert!(authorize_role(&principal(Role::Publisher), MUTATORS).allow);
        assert!(!authorize_role(&principal(Role::User), MUTATORS).allow);
    }

    #[test]
    fn role_gate_runs_before_ownership() {
        let user = principal(Role::User);
        let decision = authorize(&user, Some(user.id), Some(MUTATORS));
        assert_eq!(decision.reason, Reason::RoleNotAllowed);
        assert!(authorize(&user, Some(user.id), None).allow);
    }

    #[test]
    fn role_denial_is_forbidden() {
        let err = require_role(&principal(Role::User), MUTATORS).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "User role user is not authorized to access this route");
    }
}

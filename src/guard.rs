//! Route-level gate combining session state with the capability table.

use std::sync::Arc;

use tracing::debug;

use crate::policy::AccessPolicy;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No session; the UI should redirect to login.
    NotAuthenticated,
    /// Authenticated but the role is not listed for this capability.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Permit,
    Deny(DenyReason),
}

impl Access {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Access::Permit)
    }
}

pub struct RouteGuard {
    store: Arc<SessionStore>,
    policy: AccessPolicy,
}

impl RouteGuard {
    pub fn new(store: Arc<SessionStore>, policy: AccessPolicy) -> Self {
        Self { store, policy }
    }

    pub fn with_default_policy(store: Arc<SessionStore>) -> Self {
        Self::new(store, AccessPolicy::sales_ops_default())
    }

    /// Allow or deny a screen/action for the current session. Read-only with
    /// respect to the store.
    pub fn check(&self, capability: &str) -> Access {
        let Some(role_id) = self.store.current_role_id() else {
            debug!(capability, "denied: no session");
            return Access::Deny(DenyReason::NotAuthenticated);
        };
        if self.policy.allows(capability, role_id) {
            Access::Permit
        } else {
            debug!(capability, role_id, "denied: role not listed");
            Access::Deny(DenyReason::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryVault, PersistenceMode};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn store_with_role(role_id: i64) -> Arc<SessionStore> {
        let store = SessionStore::new(
            Arc::new(MemoryVault::new()),
            Arc::new(MemoryVault::new()),
            crate::expiry::DEFAULT_WARNING_THRESHOLD_MS,
        );
        let payload = serde_json::json!({
            "exp": chrono::Utc::now().timestamp() + 3600,
            "role_id": role_id,
            "user_id": "u-9",
            "status": 1,
        });
        let cred = format!("hdr.{}.sig", URL_SAFE_NO_PAD.encode(payload.to_string()));
        store.set(&cred, PersistenceMode::Ephemeral).unwrap();
        store
    }

    #[tokio::test]
    async fn absent_session_denies_with_redirect() {
        let store = SessionStore::new(
            Arc::new(MemoryVault::new()),
            Arc::new(MemoryVault::new()),
            crate::expiry::DEFAULT_WARNING_THRESHOLD_MS,
        );
        let guard = RouteGuard::with_default_policy(store);
        assert_eq!(
            guard.check("sales.record.view"),
            Access::Deny(DenyReason::NotAuthenticated)
        );
    }

    #[tokio::test]
    async fn listed_role_is_permitted_and_others_forbidden() {
        let guard = RouteGuard::with_default_policy(store_with_role(crate::policy::ROLE_SALES_AGENT));
        assert_eq!(guard.check("sales.record.create"), Access::Permit);
        assert!(guard.check("sales.record.create").is_permitted());
        assert_eq!(
            guard.check("users.manage"),
            Access::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            guard.check("no.such.capability"),
            Access::Deny(DenyReason::Forbidden)
        );
    }
}

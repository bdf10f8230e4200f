//! User, permission and role authorization plus a URL egress allowlist.
//!
//! Authorization passes when all configured checks pass:
//!
//! | Check | Configured by | Passes when |
//! |-------|---------------|-------------|
//! | user | `authorized_users` (empty = everyone) | `ctx.user_id` is listed |
//! | permissions | `spec.permissions` | every one is in `auth.permissions` |
//! | role | `authorized_roles` (empty = every role) | `auth.user_role` is listed |
//!
//! Egress is only checked for URL targets. With no allowlist every URL is
//! allowed; otherwise the URL must start with an entry or its host must
//! equal one.

use async_trait::async_trait;
use toolgate_application::ports::security::Security;
use toolgate_domain::{CallContext, InvocationError, ToolSpec};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct BasicSecurity {
    authorized_users: Vec<String>,
    authorized_roles: Vec<String>,
    egress_allowlist: Vec<String>,
}

impl BasicSecurity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_users = users.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_egress_allowlist<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.egress_allowlist = entries.into_iter().map(Into::into).collect();
        self
    }

    fn egress_allowed(&self, url: &str) -> bool {
        if self.egress_allowlist.is_empty() {
            return true;
        }
        let host = url_host(url);
        self.egress_allowlist
            .iter()
            .any(|entry| url.starts_with(entry.as_str()) || host == Some(entry.as_str()))
    }
}

#[async_trait]
impl Security for BasicSecurity {
    async fn authorize(&self, ctx: &CallContext, spec: &ToolSpec) -> Result<(), InvocationError> {
        let user = ctx.user_id.as_deref().unwrap_or("<anonymous>");

        if !self.authorized_users.is_empty()
            && !ctx
                .user_id
                .as_ref()
                .is_some_and(|id| self.authorized_users.contains(id))
        {
            debug!(tool = %spec.id, user, "User not in authorized list");
            return Err(InvocationError::authorization_denied(format!(
                "User {} is not authorized to execute tool {}",
                user, spec.id
            )));
        }

        if !spec.permissions.is_empty() {
            let granted = ctx.permissions();
            let missing: Vec<&str> = spec
                .permissions
                .iter()
                .map(String::as_str)
                .filter(|perm| !granted.contains(perm))
                .collect();
            if !missing.is_empty() {
                debug!(tool = %spec.id, user, ?missing, "Missing permissions");
                return Err(InvocationError::authorization_denied(format!(
                    "User {} missing required permissions: {}",
                    user,
                    missing.join(", ")
                )));
            }
        }

        if !self.authorized_roles.is_empty() {
            let role = ctx.role();
            if !role.is_some_and(|r| self.authorized_roles.iter().any(|a| a == r)) {
                debug!(tool = %spec.id, user, ?role, "Role not authorized");
                return Err(InvocationError::authorization_denied(format!(
                    "User role {} is not authorized to execute tool {}",
                    role.unwrap_or("<none>"),
                    spec.id
                )));
            }
        }

        Ok(())
    }

    async fn check_egress(&self, target: &str, _ctx: &CallContext) -> Result<(), InvocationError> {
        if url_host(target).is_none() || self.egress_allowed(target) {
            return Ok(());
        }
        debug!(target, "Egress target not in allowlist");
        Err(InvocationError::egress_denied(target))
    }
}

/// Host part of `scheme://host[:port][/...]`; `None` for non-URL targets
fn url_host(target: &str) -> Option<&str> {
    let (_, rest) = target.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

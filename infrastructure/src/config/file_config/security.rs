//! Security configuration from TOML (`[security]` section)

use crate::security::BasicSecurity;
use serde::{Deserialize, Serialize};

/// Raw security configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSecurityConfig {
    /// Users allowed to call any tool (empty = everyone)
    pub authorized_users: Vec<String>,
    /// Roles allowed to call any tool (empty = every role)
    pub authorized_roles: Vec<String>,
    /// URL prefixes or hosts that `http` tools may reach (empty = any)
    pub egress_allowlist: Vec<String>,
}

impl FileSecurityConfig {
    pub fn to_security(&self) -> BasicSecurity {
        BasicSecurity::new()
            .with_users(self.authorized_users.clone())
            .with_roles(self.authorized_roles.clone())
            .with_egress_allowlist(self.egress_allowlist.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::FileConfig;

    #[test]
    fn test_security_deserialize() {
        let toml_str = r#"
[security]
authorized_users = ["alice"]
egress_allowlist = ["api.example.com"]
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.security.authorized_users, vec!["alice"]);
        assert!(config.security.authorized_roles.is_empty());
        assert_eq!(config.security.egress_allowlist, vec!["api.example.com"]);
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::claims::{PermissionGrant, PermissionMap, PermissionView};
use crate::database::models::User;

/// How the resolver settles two roles granting permissions with the same url.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrantPrecedence {
    /// The role visited later replaces the earlier grant. Roles are visited in load order.
    #[default]
    LastWriteWins,
    /// The grant from the role with the greater id is kept, regardless of load order.
    HighestRoleId,
}

impl FromStr for GrantPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-write-wins" => Ok(GrantPrecedence::LastWriteWins),
            "highest-role-id" => Ok(GrantPrecedence::HighestRoleId),
            other => Err(format!("unknown grant precedence: {other}")),
        }
    }
}

impl fmt::Display for GrantPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantPrecedence::LastWriteWins => f.write_str("last-write-wins"),
            GrantPrecedence::HighestRoleId => f.write_str("highest-role-id"),
        }
    }
}

/// Derives a user's effective permissions from their roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionResolver {
    precedence: GrantPrecedence,
}

impl PermissionResolver {
    pub fn new(precedence: GrantPrecedence) -> Self {
        Self { precedence }
    }

    pub fn precedence(&self) -> GrantPrecedence {
        self.precedence
    }

    /// Build the url-keyed permission map for `user`.
    ///
    /// Disabled or deleted roles and permissions are skipped. A user with no
    /// roles resolves to an empty map.
    pub fn resolve(&self, user: &User) -> PermissionMap {
        let mut map = PermissionMap::new();

        for role in user.roles.iter().filter(|r| r.is_active()) {
            for permission in role.permissions.iter().filter(|p| p.is_active()) {
                let grant = PermissionGrant {
                    role_id: role.id,
                    role_name: role.name.clone(),
                    permission: PermissionView::from(permission),
                };

                match map.get(&permission.url) {
                    None => {
                        map.insert(permission.url.clone(), grant);
                    }
                    Some(existing) => {
                        let replace = match self.precedence {
                            GrantPrecedence::LastWriteWins => true,
                            // Within one role the later grant still wins
                            GrantPrecedence::HighestRoleId => role.id >= existing.role_id,
                        };
                        if replace {
                            debug!(
                                url = %permission.url,
                                previous_role = %existing.role_name,
                                role = %role.name,
                                "Permission grant overwritten for user {}",
                                user.id
                            );
                            map.insert(permission.url.clone(), grant);
                        }
                    }
                }
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Permission, Role};
    use chrono::Utc;

    fn permission(id: i32, url: &str, regex: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id,
            name: format!("perm-{id}"),
            url: url.to_string(),
            regex: regex.to_string(),
            enable: true,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn role(id: i32, permissions: Vec<Permission>) -> Role {
        let now = Utc::now();
        Role {
            id,
            name: format!("role-{id}"),
            enable: true,
            deleted: false,
            created_at: now,
            updated_at: now,
            permissions,
        }
    }

    fn user(roles: Vec<Role>) -> User {
        let now = Utc::now();
        User {
            id: 1,
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: String::new(),
            enable: true,
            deleted: false,
            created_at: now,
            updated_at: now,
            roles,
        }
    }

    #[test]
    fn user_without_roles_resolves_to_empty_map() {
        let resolver = PermissionResolver::default();
        assert!(resolver.resolve(&user(vec![])).is_empty());
        assert!(resolver.resolve(&user(vec![role(1, vec![])])).is_empty());
    }

    #[test]
    fn later_role_overwrites_same_url() {
        let first = role(7, vec![permission(1, "/x", "^/x$")]);
        let second = role(3, vec![permission(2, "/x", "^/x.*$")]);
        let map = PermissionResolver::default().resolve(&user(vec![first, second]));

        assert_eq!(map.len(), 1);
        let grant = &map["/x"];
        assert_eq!(grant.role_id, 3);
        assert_eq!(grant.permission.id, 2);
    }

    #[test]
    fn highest_role_id_ignores_load_order() {
        let high = role(7, vec![permission(1, "/x", "^/x$")]);
        let low = role(3, vec![permission(2, "/x", "^/x.*$")]);
        let resolver = PermissionResolver::new(GrantPrecedence::HighestRoleId);

        let forward = resolver.resolve(&user(vec![high.clone(), low.clone()]));
        let backward = resolver.resolve(&user(vec![low, high]));
        assert_eq!(forward["/x"].role_id, 7);
        assert_eq!(forward, backward);
    }

    #[test]
    fn same_role_keeps_its_later_grant_under_either_precedence() {
        // Shape of the seeded admin role: users:read then users:write on one url
        let admin = role(
            2,
            vec![
                permission(2, "/api/users", "^/api/users$"),
                permission(3, "/api/users", "^/api/users.*$"),
            ],
        );

        for precedence in [GrantPrecedence::LastWriteWins, GrantPrecedence::HighestRoleId] {
            let map = PermissionResolver::new(precedence).resolve(&user(vec![admin.clone()]));
            assert_eq!(map["/api/users"].permission.id, 3, "{precedence}");
            assert_eq!(map["/api/users"].permission.regex, "^/api/users.*$");
        }
    }

    #[test]
    fn highest_role_id_keeps_higher_role_over_later_lower_role() {
        let high = role(5, vec![permission(1, "/x", "^/x$")]);
        let low = role(2, vec![permission(2, "/x", "^/x.*$"), permission(3, "/x", "^/x/y$")]);
        let map = PermissionResolver::new(GrantPrecedence::HighestRoleId)
            .resolve(&user(vec![high, low]));
        assert_eq!(map["/x"].role_id, 5);
        assert_eq!(map["/x"].permission.id, 1);
    }

    #[test]
    fn inactive_entries_are_skipped() {
        let mut disabled = permission(1, "/a", "^/a$");
        disabled.enable = false;
        let mut deleted_role = role(2, vec![permission(2, "/b", "^/b$")]);
        deleted_role.deleted = true;

        let map = PermissionResolver::default().resolve(&user(vec![
            role(1, vec![disabled, permission(3, "/c", "^/c$")]),
            deleted_role,
        ]));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["/c"]);
    }

    #[test]
    fn precedence_parses_from_config_strings() {
        assert_eq!(
            "last-write-wins".parse::<GrantPrecedence>().unwrap(),
            GrantPrecedence::LastWriteWins
        );
        assert_eq!(
            "Highest-Role-Id".parse::<GrantPrecedence>().unwrap(),
            GrantPrecedence::HighestRoleId
        );
        assert!("random".parse::<GrantPrecedence>().is_err());
    }
}

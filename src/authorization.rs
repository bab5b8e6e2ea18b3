use crate::error::{InventoryReportError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Reports,
    Inventory,
    Products,
    Purchases,
    Sales,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
    Export,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Reports => "reports",
            Resource::Inventory => "inventory",
            Resource::Products => "products",
            Resource::Purchases => "purchases",
            Resource::Sales => "sales",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Export => "export",
        };
        f.write_str(name)
    }
}

/// Capability check handed to every boundary that needs one.
pub trait Authorizer {
    fn can(&self, resource: Resource, action: Action) -> bool;

    fn require(&self, resource: Resource, action: Action) -> Result<()> {
        if self.can(resource, action) {
            Ok(())
        } else {
            Err(InventoryReportError::Unauthorized {
                resource: resource.to_string(),
                action: action.to_string(),
            })
        }
    }
}

/// Grants every capability. For trusted in-process callers and tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can(&self, _resource: Resource, _action: Action) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PermissionGrant {
    pub resource: Resource,
    pub actions: Vec<Action>,
}

/// Role membership as returned by the role lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RoleGrants {
    pub role: String,
    pub grants: Vec<PermissionGrant>,
}

/// Permissions of one user, resolved from the roles assigned to them.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    roles: Vec<String>,
    permissions: HashSet<(Resource, Action)>,
}

impl RoleAuthorizer {
    pub fn from_roles(assigned: &[RoleGrants]) -> Self {
        let mut permissions = HashSet::new();
        for role in assigned {
            for grant in &role.grants {
                for action in &grant.actions {
                    permissions.insert((grant.resource, *action));
                }
            }
        }

        Self {
            roles: assigned.iter().map(|r| r.role.clone()).collect(),
            permissions,
        }
    }

    /// Resolves the named roles against a catalogue of role definitions. Unknown role
    /// names grant nothing.
    pub fn for_user(role_names: &[&str], catalogue: &HashMap<String, RoleGrants>) -> Self {
        let assigned: Vec<RoleGrants> = role_names
            .iter()
            .filter_map(|name| catalogue.get(*name).cloned())
            .collect();
        Self::from_roles(&assigned)
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}

impl Authorizer for RoleAuthorizer {
    fn can(&self, resource: Resource, action: Action) -> bool {
        self.permissions.contains(&(resource, action))
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::directory::DirectoryRole;

/// Role template ids treated as administrative when no override is configured.
pub const DEFAULT_ADMIN_ROLE_TEMPLATE_IDS: [&str; 5] = [
    "62e90394-69f5-4237-9190-012177145e10", // Global Administrator
    "fe930be7-5e62-47db-91af-98c3a49a38b1", // SharePoint Administrator
    "29232cdf-9323-42fd-ade2-1d097af3e4de", // Teams Administrator
    "f2ef992c-3afb-46b9-b7cf-a126ee74c451", // Exchange Administrator
    "b0f54661-2d74-4c50-afa3-1ec803f12efe", // User Administrator
];

/// Immutable allow-list of administrative role template ids.
///
/// Entries are normalized to lowercase on construction so lookups are a
/// single hash probe against a lowercased candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRoleRegistry {
    template_ids: HashSet<String>,
}

impl AdminRoleRegistry {
    pub fn new<I, S>(template_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let template_ids = template_ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_lowercase())
            .filter(|id| !id.is_empty())
            .collect();

        Self { template_ids }
    }

    pub fn len(&self) -> usize {
        self.template_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.template_ids.is_empty()
    }

    /// Case-insensitive membership test for one role template id
    pub fn contains(&self, role_template_id: &str) -> bool {
        self.template_ids.contains(&role_template_id.to_lowercase())
    }

    /// True if any role in `roles` carries an administrative template id.
    /// Roles without a template id never match.
    pub fn matches_any(&self, roles: &[DirectoryRole]) -> bool {
        roles.iter().any(|role| {
            let is_admin = role
                .role_template_id
                .as_deref()
                .is_some_and(|id| self.contains(id));

            tracing::debug!(
                "Checking role: {} (template id: {}) -> admin: {}",
                role.display_name,
                role.role_template_id.as_deref().unwrap_or("<none>"),
                is_admin
            );

            is_admin
        })
    }
}

impl Default for AdminRoleRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_ROLE_TEMPLATE_IDS)
    }
}

/// Outcome of one admin-status resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDecision {
    pub is_admin: bool,
}

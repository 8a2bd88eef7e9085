//! Static capability table: which roles may use which capability.
//! Replaces the role-number branching the screens used to scatter around.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

pub const ROLE_ADMIN: i64 = 1;
pub const ROLE_SALES_MANAGER: i64 = 2;
pub const ROLE_SALES_AGENT: i64 = 3;
pub const ROLE_CATALOG_EDITOR: i64 = 4;

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    table: HashMap<String, HashSet<i64>>,
}

impl AccessPolicy {
    pub fn from_entries(entries: &[(&str, &[i64])]) -> Self {
        let table = entries
            .iter()
            .map(|(cap, roles)| ((*cap).to_string(), roles.iter().copied().collect()))
            .collect();
        Self { table }
    }

    /// Pure lookup. Unknown capability names deny by default.
    pub fn allows(&self, capability: &str, role_id: i64) -> bool {
        self.table
            .get(capability)
            .map_or(false, |roles| roles.contains(&role_id))
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// The sales-operations client's capability table.
    pub fn sales_ops_default() -> Self {
        SALES_OPS_TABLE.clone()
    }
}

static SALES_OPS_TABLE: Lazy<AccessPolicy> = Lazy::new(|| {
    AccessPolicy::from_entries(&[
        ("sales.record.view", &[ROLE_ADMIN, ROLE_SALES_MANAGER, ROLE_SALES_AGENT]),
        ("sales.record.create", &[ROLE_ADMIN, ROLE_SALES_MANAGER, ROLE_SALES_AGENT]),
        ("sales.record.update", &[ROLE_ADMIN, ROLE_SALES_MANAGER]),
        ("sales.record.delete", &[ROLE_ADMIN]),
        ("users.manage", &[ROLE_ADMIN]),
        ("pricing.zone.view", &[ROLE_ADMIN, ROLE_SALES_MANAGER, ROLE_SALES_AGENT]),
        ("pricing.zone.edit", &[ROLE_ADMIN, ROLE_SALES_MANAGER]),
        ("catalog.view", &[ROLE_ADMIN, ROLE_SALES_MANAGER, ROLE_SALES_AGENT, ROLE_CATALOG_EDITOR]),
        ("catalog.edit", &[ROLE_ADMIN, ROLE_CATALOG_EDITOR]),
        ("export.run", &[ROLE_ADMIN, ROLE_SALES_MANAGER]),
    ])
});

//! Per-operation-kind completion budgets
//!
//! Ceilings for waiting out a pending remote operation. Create and update
//! share the 30 minute default the remote API documents for container
//! mutations; deletes are allowed longer since the remote side tears down
//! dependent entities first.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct OperationTimeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(45 * 60),
        }
    }
}

impl OperationTimeouts {
    /// One ceiling for everything. Mostly useful in tests.
    pub fn uniform(budget: Duration) -> Self {
        Self {
            create: budget,
            update: budget,
            delete: budget,
        }
    }

    /// Budget for a CreateOrUpdate mutation. `child_exists` picks create
    /// vs. update. Reads never issue a mutation and have no budget here.
    pub fn for_create_or_update(&self, child_exists: bool) -> Duration {
        if child_exists {
            self.update
        } else {
            self.create
        }
    }

    pub fn for_delete(&self) -> Duration {
        self.delete
    }
}

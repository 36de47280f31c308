//! Second pass: manager links, resolved once every descriptor of the batch
//! has been upserted so forward references inside the batch work.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use roster_core::EmployeeId;
use roster_store::employees;
use roster_store::{Connection, StoreError};

/// Pending `(subordinate, manager external_ref)` links from pass one.
#[derive(Debug, Default)]
pub struct ManagerQueue {
    pending: Vec<(EmployeeId, String)>,
}

impl ManagerQueue {
    pub fn push(&mut self, subordinate: EmployeeId, manager_ref: impl Into<String>) {
        self.pending.push((subordinate, manager_ref.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Links that changed `manager_id`.
    pub linked: u32,
    /// Manager not known yet; retried by a later run.
    pub deferred: u32,
}

/// Drain `queue`. Managers are looked up in `batch` (external_ref to id of
/// this run's upserts) first, then in the store.
pub fn link_managers(
    conn: &Connection,
    queue: ManagerQueue,
    batch: &HashMap<String, EmployeeId>,
    now: DateTime<Utc>,
) -> Result<LinkStats, StoreError> {
    let mut stats = LinkStats::default();
    for (subordinate, manager_ref) in queue.pending {
        let manager = match batch.get(&manager_ref) {
            Some(id) => Some(*id),
            None => employees::find_by_external_ref(conn, &manager_ref)?.map(|e| e.id),
        };
        let Some(manager) = manager.filter(|m| *m != subordinate) else {
            tracing::debug!(%subordinate, manager_ref = %manager_ref, "manager not resolved; deferring link");
            stats.deferred += 1;
            continue;
        };
        if employees::get(conn, subordinate)?.manager_id == Some(manager) {
            continue;
        }
        employees::set_manager(conn, subordinate, Some(manager), now)?;
        stats.linked += 1;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::EmployeeStatus;
    use roster_store::employees::NewEmployee;
    use roster_store::Store;

    fn employee(conn: &Connection, external_ref: &str) -> EmployeeId {
        employees::insert(
            conn,
            &NewEmployee {
                external_ref: Some(external_ref.into()),
                email: format!("{}@corp.test", external_ref.to_lowercase()),
                first_name: external_ref.into(),
                middle_name: None,
                last_name: "Test".into(),
                title: String::new(),
                status: EmployeeStatus::Active,
                is_blocked: false,
                org_unit_id: None,
                password_hash: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn links_through_batch_map_and_store() {
        let store = Store::in_memory().unwrap();
        let boss = employee(store.conn(), "B1");
        let lead = employee(store.conn(), "L1");
        let dev = employee(store.conn(), "D1");

        let mut queue = ManagerQueue::default();
        queue.push(lead, "B1");
        queue.push(dev, "L1");
        let batch = HashMap::from([("L1".to_owned(), lead)]);

        let stats = link_managers(store.conn(), queue, &batch, Utc::now()).unwrap();
        assert_eq!(stats, LinkStats { linked: 2, deferred: 0 });
        assert_eq!(employees::get(store.conn(), lead).unwrap().manager_id, Some(boss));
        assert_eq!(employees::get(store.conn(), dev).unwrap().manager_id, Some(lead));
    }

    #[test]
    fn unknown_manager_is_deferred() {
        let store = Store::in_memory().unwrap();
        let dev = employee(store.conn(), "D1");
        let mut queue = ManagerQueue::default();
        queue.push(dev, "NOBODY");
        let stats = link_managers(store.conn(), queue, &HashMap::new(), Utc::now()).unwrap();
        assert_eq!(stats, LinkStats { linked: 0, deferred: 1 });
        assert_eq!(employees::get(store.conn(), dev).unwrap().manager_id, None);
    }

    #[test]
    fn existing_link_is_not_rewritten() {
        let store = Store::in_memory().unwrap();
        let boss = employee(store.conn(), "B1");
        let dev = employee(store.conn(), "D1");
        employees::set_manager(store.conn(), dev, Some(boss), Utc::now()).unwrap();

        let mut queue = ManagerQueue::default();
        queue.push(dev, "B1");
        assert!(!queue.is_empty());
        let stats = link_managers(store.conn(), queue, &HashMap::new(), Utc::now()).unwrap();
        assert_eq!(stats, LinkStats::default());
    }

    #[test]
    fn new_queue_is_empty() {
        assert!(ManagerQueue::default().is_empty());
    }
}

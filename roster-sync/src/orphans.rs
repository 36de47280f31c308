//! Active employees missing from the incoming batch. Advisory only: the
//! employees are never touched here.

use std::collections::HashSet;

use roster_core::{Descriptor, Employee, JobId, NewRecord};

/// Every non-empty `external_ref` and email of the batch, including
/// descriptors that later failed.
pub fn incoming_keys(descriptors: &[Descriptor]) -> HashSet<String> {
    let mut keys = HashSet::with_capacity(descriptors.len() * 2);
    for d in descriptors {
        if let Some(external_ref) = d.external_ref.as_deref() {
            keys.insert(external_ref.to_owned());
        }
        if !d.email.is_empty() {
            keys.insert(d.email.clone());
        }
    }
    keys
}

/// One `orphaned` record per active employee known by neither key.
pub fn detect_orphans(job_id: JobId, incoming: &HashSet<String>, active: &[Employee]) -> Vec<NewRecord> {
    active
        .iter()
        .filter(|e| {
            let by_ref = e
                .external_ref
                .as_deref()
                .is_some_and(|r| incoming.contains(r));
            let by_email = incoming.contains(&e.email.to_lowercase());
            !by_ref && !by_email
        })
        .map(|e| NewRecord::orphaned(job_id, e.identity_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roster_core::{EmployeeId, EmployeeStatus, RecordAction, RecordStatus};

    fn employee(id: i64, external_ref: Option<&str>, email: &str) -> Employee {
        let now = Utc::now();
        Employee {
            id: EmployeeId(id),
            external_ref: external_ref.map(str::to_owned),
            email: email.to_owned(),
            first_name: "F".into(),
            middle_name: None,
            last_name: "L".into(),
            title: String::new(),
            status: EmployeeStatus::Active,
            is_blocked: false,
            manager_id: None,
            org_unit_id: None,
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn descriptor(external_ref: Option<&str>, email: &str) -> Descriptor {
        Descriptor {
            external_ref: external_ref.map(str::to_owned),
            email: email.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_employee_is_orphaned_with_identity_key() {
        let incoming = incoming_keys(&[descriptor(Some("E1"), "e1@corp.test")]);
        let active = [
            employee(1, Some("E1"), "e1@corp.test"),
            employee(7, Some("E7"), "e7@corp.test"),
            employee(8, None, "legacy@corp.test"),
        ];
        let records = detect_orphans(JobId(3), &incoming, &active);
        let keys: Vec<_> = records.iter().map(|r| r.external_ref.as_str()).collect();
        assert_eq!(keys, vec!["E7", "legacy@corp.test"]);
        assert!(records.iter().all(|r| r.action == RecordAction::Archive
            && r.status == RecordStatus::Orphaned
            && r.job_id == JobId(3)));
        assert_eq!(records[0].message.as_deref(), Some("missing in source payload"));
    }

    #[test]
    fn match_on_either_key_is_enough() {
        let incoming = incoming_keys(&[
            descriptor(Some("NEW-REF"), "e1@corp.test"),
            descriptor(Some("E2"), "renamed@corp.test"),
        ]);
        let active = [
            employee(1, Some("E1"), "E1@corp.test"),
            employee(2, Some("E2"), "old@corp.test"),
        ];
        assert!(detect_orphans(JobId(1), &incoming, &active).is_empty());
    }

    #[test]
    fn empty_batch_orphans_everyone() {
        let active = [employee(1, Some("E1"), "e1@corp.test")];
        assert_eq!(detect_orphans(JobId(1), &HashSet::new(), &active).len(), 1);
    }
}

//! Audit snapshots of incoming descriptors.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use roster_core::{Descriptor, JobId};
use roster_store::snapshots::{self, NewSnapshot};
use roster_store::Connection;

use crate::error::SyncError;

/// SHA-256 hex digest of the canonical JSON encoding of `value`.
///
/// Object keys serialize in sorted order, so equal values hash equally.
pub fn digest(value: &serde_json::Value) -> Result<String, SyncError> {
    let encoded = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}

/// Write one snapshot row for `descriptor`. Failures propagate and abort the
/// job.
pub fn record(
    conn: &Connection,
    job_id: JobId,
    descriptor: &Descriptor,
    received_at: DateTime<Utc>,
) -> Result<(), SyncError> {
    let normalized = serde_json::to_value(descriptor)?;
    let digest = digest(&normalized)?;
    snapshots::insert(
        conn,
        &NewSnapshot {
            job_id,
            external_ref: descriptor.identity_key(),
            payload: &descriptor.raw,
            normalized: &normalized,
            digest: &digest,
            received_at,
        },
    )?;
    Ok(())
}

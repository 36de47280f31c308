//! Credential hashing collaborator.

use sha2::{Digest, Sha256};

use roster_core::CredentialScheme;

/// Turns an incoming credential into the value stored on the employee.
pub trait CredentialHasher: Send + Sync {
    fn stored_hash(&self, incoming: &str) -> String;
}

/// Stores whatever the source sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl CredentialHasher for PassThrough {
    fn stored_hash(&self, incoming: &str) -> String {
        incoming.to_owned()
    }
}

/// Hashes plaintext to `sha256$<hex>`; values already tagged with a
/// `<scheme>$` prefix are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl CredentialHasher for Sha256Hasher {
    fn stored_hash(&self, incoming: &str) -> String {
        if has_scheme_prefix(incoming) {
            return incoming.to_owned();
        }
        let mut hasher = Sha256::new();
        hasher.update(incoming.as_bytes());
        format!("sha256${}", hex::encode(hasher.finalize()))
    }
}

fn has_scheme_prefix(value: &str) -> bool {
    match value.split_once('$') {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && !rest.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        None => false,
    }
}

/// The hasher configured by `credentials` in `config.yaml`.
pub fn hasher_for(scheme: CredentialScheme) -> Box<dyn CredentialHasher> {
    match scheme {
        CredentialScheme::Passthrough => Box::new(PassThrough),
        CredentialScheme::Sha256 => Box::new(Sha256Hasher),
    }
}

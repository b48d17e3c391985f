//! Catalog fingerprinting and snapshot cache keys.
//!
//! The fingerprint is a sha256 digest of the full catalog serialisation (the
//! engine-read subtree: accounts, bills, interests, transfers, pensions,
//! social security, healthcare and spending-tracker configs, scenario
//! variables, RMD/AWI tables) plus the Monte Carlo flag. Serialisation order
//! is deterministic (struct fields and `BTreeMap`s only), so equal catalogs
//! digest equally.

use billsim_core::Catalog;
use jiff::civil::Date;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Digest of everything the engine reads. Runs with different fingerprints
/// can never share snapshots.
pub fn catalog_fingerprint(catalog: &Catalog, monte_carlo: bool) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(catalog)?);
    hasher.update([monte_carlo as u8]);
    Ok(hex::encode(hasher.finalize()))
}

/// Cache key for one `(scenario, fingerprint, date)` triple: sha256 of the
/// concatenation, truncated to 16 bytes and hex-encoded (the disk filename).
pub fn snapshot_key(scenario: &str, fingerprint: &str, date: Date) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scenario.as_bytes());
    hasher.update(fingerprint.as_bytes());
    hasher.update(date.to_string().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

//! Key registry used for signature verification.

use liberty_schema::{KeyEntry, KeyRecord};
use std::collections::BTreeMap;

/// One record per configured key, in key-name order.
pub fn build_key_map(keys: &BTreeMap<String, KeyEntry>) -> Vec<KeyRecord> {
    keys.values().map(KeyRecord::from).collect()
}

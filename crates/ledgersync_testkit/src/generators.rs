//! Property-based test generators using proptest.
//!
//! Provides strategies for generating collections and reconciliation
//! scenarios that maintain the working-set invariants (unique ids).

use crate::fixtures::Keyword;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for generating non-blank titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,11}( [a-z]{1,8})?").expect("Invalid regex")
}

/// Strategy for generating keywords without a category.
pub fn keyword_strategy() -> impl Strategy<Value = Keyword> {
    title_strategy().prop_map(Keyword::new)
}

/// A reconciliation scenario over server ids.
///
/// `pending` is always a subset of `local`.
#[derive(Debug, Clone)]
pub struct ReconcileCase {
    /// Ids present in the working set and mirror before the fetch.
    pub local: BTreeSet<String>,
    /// Ids returned by the fetch.
    pub fetched: BTreeSet<String>,
    /// Local ids with a pending mirror record.
    pub pending: BTreeSet<String>,
}

/// Strategy for generating reconciliation scenarios over up to `max_ids`
/// distinct ids.
pub fn reconcile_case_strategy(max_ids: u8) -> impl Strategy<Value = ReconcileCase> {
    (id_set(max_ids), id_set(max_ids), any::<u64>()).prop_map(|(local, fetched, mask)| {
        let pending = local
            .iter()
            .filter(|n| mask & (1u64 << (u32::from(**n) % 64)) != 0)
            .map(|n| id(*n))
            .collect();
        ReconcileCase {
            local: local.into_iter().map(id).collect(),
            fetched: fetched.into_iter().map(id).collect(),
            pending,
        }
    })
}

fn id_set(max_ids: u8) -> impl Strategy<Value = BTreeSet<u8>> {
    prop::collection::btree_set(0..max_ids, 0..=usize::from(max_ids / 2))
}

fn id(n: u8) -> String {
    format!("{}", u32::from(n) + 100)
}

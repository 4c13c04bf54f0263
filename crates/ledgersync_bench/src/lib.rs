//! Benchmark utilities.

use ledgersync_core::Entity;
use ledgersync_testkit::{confirmed, EventCategory, Keyword};

/// Generate `count` confirmed keywords with ids starting at `first_id`.
pub fn generate_keywords(first_id: usize, count: usize) -> Vec<Entity<Keyword>> {
    (first_id..first_id + count)
        .map(|n| {
            let category = EventCategory::new(format!("Category {}", n % 16));
            let keyword = Keyword::new(format!("Keyword {n}"))
                .with_category((n % 16).to_string(), category);
            confirmed(n.to_string(), keyword)
        })
        .collect()
}

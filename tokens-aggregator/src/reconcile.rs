use std::collections::{BTreeSet, HashSet};

use crate::bucket::TokenRecord;

/// Difference between the persisted bucket of a chain and the freshly computed one.
#[derive(Debug, PartialEq)]
pub struct StateDiff<'a> {
    /// New tokens, in bucket order. Only these need an image download.
    pub added: Vec<&'a TokenRecord>,
    /// Ids that dropped out of the bucket. Their cached images are stale.
    pub removed: BTreeSet<String>,
}

impl<'a> StateDiff<'a> {
    pub fn compute(previous_ids: &HashSet<String>, current: &'a [TokenRecord]) -> Self {
        let current_ids: HashSet<&str> = current.iter().map(|record| record.id.as_str()).collect();

        let removed = previous_ids
            .iter()
            .filter(|id| !current_ids.contains(id.as_str()))
            .cloned()
            .collect();

        let added = current
            .iter()
            .filter(|record| !previous_ids.contains(&record.id))
            .collect();

        Self { added, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use token_address::ContractAddress;

    use super::*;
    use crate::bucket::tests::market;

    fn records(ids: &[&str]) -> Vec<TokenRecord> {
        ids.iter()
            .map(|id| TokenRecord::new(&market(id, 1.0), ContractAddress::Contract("0x0".into()), "ethereum"))
            .collect()
    }

    fn id_set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn added_and_removed_ids() {
        let current = records(&["tok1", "tok3"]);

        let diff = StateDiff::compute(&id_set(&["tok1", "tok2"]), &current);

        assert_eq!(diff.removed, BTreeSet::from(["tok2".to_string()]));
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].id, "tok3");
    }

    #[test]
    fn first_run_adds_everything() {
        let current = records(&["tok1", "tok2", "tok3"]);

        let diff = StateDiff::compute(&HashSet::new(), &current);

        assert!(diff.removed.is_empty());
        assert_eq!(diff.added, current.iter().collect::<Vec<_>>());
    }

    #[test]
    fn unchanged_state_is_empty_diff() {
        let current = records(&["tok1", "tok3"]);
        let previous = id_set(&["tok1", "tok3"]);

        let first = StateDiff::compute(&previous, &current);
        let second = StateDiff::compute(&previous, &current);

        assert!(first.is_empty());
        assert_eq!(first, second);
    }
}

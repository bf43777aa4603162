//! Item store service module
//!
//! In-memory working set for one recomputation: the fetched snapshot keyed
//! by issue number plus the adjacency structures derived from it. The store
//! is fully replaced per recomputation; no state survives across runs.

use std::collections::HashMap;

use crate::domain::entities::{Item, ItemKind};

/// Snapshot of a project's items with derived adjacency maps
///
/// Three structures are derived while loading: dependencies
/// (issue -> blockers), parent -> children, and milestone -> members. Each
/// item is also classified into its behavioral [`ItemKind`] so downstream
/// passes dispatch on the tag instead of re-checking raw fields.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: HashMap<u64, Item>,
    kinds: HashMap<u64, ItemKind>,
    dependencies: HashMap<u64, Vec<u64>>,
    parent_children: HashMap<u64, Vec<u64>>,
    milestone_members: HashMap<u64, Vec<u64>>,
    /// Issue numbers in pagination order
    order: Vec<u64>,
}

impl ItemStore {
    /// Builds the store from a fetched snapshot
    ///
    /// Parent/child links are taken from both directions (an item's
    /// `parent` and an item's `sub_issues`) and de-duplicated, so a link
    /// reported on either side is enough.
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut store = Self::default();

        for item in &items {
            store.order.push(item.number);

            if !item.blocked_by.is_empty() {
                store
                    .dependencies
                    .insert(item.number, item.blocked_by.clone());
            }

            if let Some(parent) = item.parent {
                store.link_child(parent, item.number);
            }
            for &child in &item.sub_issues {
                store.link_child(item.number, child);
            }

            if let Some(milestone) = &item.milestone {
                store
                    .milestone_members
                    .entry(milestone.number)
                    .or_default()
                    .push(item.number);
            }
        }

        for item in items {
            store.items.insert(item.number, item);
        }

        for &number in &store.order {
            let kind = store.classify(number);
            store.kinds.insert(number, kind);
        }

        store
    }

    fn link_child(&mut self, parent: u64, child: u64) {
        let children = self.parent_children.entry(parent).or_default();
        if !children.contains(&child) {
            children.push(child);
        }
    }

    fn classify(&self, number: u64) -> ItemKind {
        let item = &self.items[&number];
        if item.is_completed() {
            ItemKind::Completed
        } else if self
            .parent_children
            .get(&number)
            .is_some_and(|children| !children.is_empty())
        {
            ItemKind::Summary
        } else {
            ItemKind::Leaf
        }
    }

    pub fn get(&self, number: u64) -> Option<&Item> {
        self.items.get(&number)
    }

    pub fn kind(&self, number: u64) -> Option<ItemKind> {
        self.kinds.get(&number).copied()
    }

    /// Blockers of an issue; empty when none are recorded
    pub fn blockers_of(&self, number: u64) -> &[u64] {
        self.dependencies
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Children of an issue; empty when it has none
    pub fn children_of(&self, number: u64) -> &[u64] {
        self.parent_children
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parents with at least one known child
    pub fn parents(&self) -> impl Iterator<Item = (u64, &[u64])> {
        self.parent_children
            .iter()
            .map(|(parent, children)| (*parent, children.as_slice()))
    }

    /// Milestone number -> member issue numbers
    pub fn milestone_members(&self) -> &HashMap<u64, Vec<u64>> {
        &self.milestone_members
    }

    /// Issue numbers in the order pagination returned them
    pub fn numbers_in_order(&self) -> &[u64] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.order.iter().filter_map(|n| self.items.get(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{IssueState, Milestone};

    fn item(number: u64) -> Item {
        Item::new(format!("I{number}"), number, format!("Item {number}"))
    }

    #[test]
    fn test_adjacency_from_both_directions() {
        let mut parent = item(1);
        parent.sub_issues = vec![2];
        let mut child_a = item(2);
        child_a.parent = Some(1);
        let mut child_b = item(3);
        child_b.parent = Some(1);

        let store = ItemStore::from_items(vec![parent, child_a, child_b]);

        let mut children = store.children_of(1).to_vec();
        children.sort_unstable();
        assert_eq!(children, vec![2, 3]);
        assert_eq!(store.kind(1), Some(ItemKind::Summary));
        assert_eq!(store.kind(2), Some(ItemKind::Leaf));
    }

    #[test]
    fn test_completed_wins_over_summary() {
        let mut parent = item(1);
        parent.sub_issues = vec![2];
        parent.state = IssueState::Closed;
        let child = item(2);

        let store = ItemStore::from_items(vec![parent, child]);
        assert_eq!(store.kind(1), Some(ItemKind::Completed));
    }

    #[test]
    fn test_dependencies_and_milestones() {
        let mut blocked = item(2);
        blocked.blocked_by = vec![1];
        blocked.milestone = Some(Milestone {
            number: 9,
            title: "v1".to_string(),
            description: None,
            due_on: None,
            state: "open".to_string(),
            url: None,
        });

        let store = ItemStore::from_items(vec![item(1), blocked]);
        assert_eq!(store.blockers_of(2), &[1]);
        assert!(store.blockers_of(1).is_empty());
        assert_eq!(store.milestone_members().get(&9), Some(&vec![2]));
    }

    #[test]
    fn test_order_preserved() {
        let store = ItemStore::from_items(vec![item(5), item(3), item(8)]);
        assert_eq!(store.numbers_in_order(), &[5, 3, 8]);
    }
}

//! Branch - internal tree node, container of child branches and leaves

use crate::leaf::Leaf;
use crate::seed::Seed;
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A child of a branch: either a sub-branch or a leaf.
///
/// Sibling names are unique across both kinds — a branch and a leaf
/// cannot share a name under the same parent.
#[derive(Debug, PartialEq)]
pub enum Node {
    Branch(Branch),
    Leaf(Leaf),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::Branch(b) => b.name(),
            Self::Leaf(l) => l.name(),
        }
    }

    fn set_name(&mut self, name: &str) {
        match self {
            Self::Branch(b) => b.set_name(name),
            Self::Leaf(l) => l.set_name(name),
        }
    }
}

/// A named container of child branches and leaves.
///
/// Ownership flows strictly parent to child; there is no stored parent
/// back-reference, paths are always resolved from the root.
#[derive(Debug, PartialEq)]
pub struct Branch {
    name: String,
    children: BTreeMap<String, Node>,
}

impl Branch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn get_branch(&self, name: &str) -> Option<&Branch> {
        match self.children.get(name) {
            Some(Node::Branch(b)) => Some(b),
            _ => None,
        }
    }

    pub fn get_branch_mut(&mut self, name: &str) -> Option<&mut Branch> {
        match self.children.get_mut(name) {
            Some(Node::Branch(b)) => Some(b),
            _ => None,
        }
    }

    pub fn get_leaf(&self, name: &str) -> Option<&Leaf> {
        match self.children.get(name) {
            Some(Node::Leaf(l)) => Some(l),
            _ => None,
        }
    }

    pub fn get_leaf_mut(&mut self, name: &str) -> Option<&mut Leaf> {
        match self.children.get_mut(name) {
            Some(Node::Leaf(l)) => Some(l),
            _ => None,
        }
    }

    /// Attach a pre-built sub-branch. Fails if the name is taken.
    pub fn add_branch(&mut self, branch: Branch) -> bool {
        if self.has_child(branch.name()) {
            return false;
        }
        self.children
            .insert(branch.name().to_string(), Node::Branch(branch));
        true
    }

    /// Attach a pre-built leaf. Fails if the name is taken.
    pub fn add_leaf(&mut self, leaf: Leaf) -> bool {
        if self.has_child(leaf.name()) {
            return false;
        }
        self.children
            .insert(leaf.name().to_string(), Node::Leaf(leaf));
        true
    }

    /// Detach a sub-branch, transferring ownership to the caller.
    pub fn remove_branch(&mut self, name: &str) -> Option<Branch> {
        match self.children.get(name) {
            Some(Node::Branch(_)) => match self.children.remove(name) {
                Some(Node::Branch(b)) => Some(b),
                _ => unreachable!(),
            },
            _ => None,
        }
    }

    /// Detach a leaf, transferring ownership to the caller.
    pub fn remove_leaf(&mut self, name: &str) -> Option<Leaf> {
        match self.children.get(name) {
            Some(Node::Leaf(_)) => match self.children.remove(name) {
                Some(Node::Leaf(l)) => Some(l),
                _ => unreachable!(),
            },
            _ => None,
        }
    }

    /// Rename a child in place, preserving its subtree and callbacks.
    /// Fails if the source is absent or the target name is taken.
    pub fn rename_child(&mut self, from: &str, to: &str) -> bool {
        if !self.has_child(from) || self.has_child(to) {
            return false;
        }
        let mut node = self.children.remove(from).expect("checked above");
        node.set_name(to);
        self.children.insert(to.to_string(), node);
        true
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.children
            .values()
            .filter_map(|n| match n {
                Node::Branch(b) => Some(b.name().to_string()),
                Node::Leaf(_) => None,
            })
            .collect()
    }

    pub fn leaf_names(&self) -> Vec<String> {
        self.children
            .values()
            .filter_map(|n| match n {
                Node::Leaf(l) => Some(l.name().to_string()),
                Node::Branch(_) => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Generate the seed chain that would rebuild this subtree at
    /// `base_path` on another root: one add per node, plus a set for
    /// every leaf carrying data. Leaf sets keep their original update
    /// times so replayed chronology stays intact.
    pub(crate) fn graft_seeds(&self, base_path: &str, origin: DateTime<Utc>, seeds: &mut Vec<Seed>) {
        seeds.push(Seed::add_branch(base_path, origin));
        for node in self.children.values() {
            let child_path = crate::path::join(base_path, node.name());
            match node {
                Node::Branch(b) => b.graft_seeds(&child_path, origin, seeds),
                Node::Leaf(l) => {
                    seeds.push(Seed::add_leaf(&child_path, origin));
                    if !l.value().is_empty() {
                        seeds.push(Seed::set_leaf(
                            &child_path,
                            l.value().clone(),
                            l.last_update(),
                        ));
                    }
                }
            }
        }
    }

    /// Seed chain for a single grafted leaf at `path`.
    pub(crate) fn leaf_graft_seeds(leaf: &Leaf, path: &str, origin: DateTime<Utc>) -> Vec<Seed> {
        let mut seeds = vec![Seed::add_leaf(path, origin)];
        if !leaf.value().is_empty() {
            seeds.push(Seed::set_leaf(path, leaf.value().clone(), leaf.last_update()));
        }
        seeds
    }

    /// Look up a leaf value without consuming it.
    pub fn leaf_value(&self, name: &str) -> Option<&Value> {
        self.get_leaf(name).map(|l| l.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;

    #[test]
    fn sibling_names_unique_across_kinds() {
        let mut branch = Branch::new("parent");
        assert!(branch.add_branch(Branch::new("twin")));
        assert!(!branch.add_leaf(Leaf::new("twin")));
        assert!(!branch.add_branch(Branch::new("twin")));
    }

    #[test]
    fn remove_respects_kind() {
        let mut branch = Branch::new("parent");
        branch.add_branch(Branch::new("b"));
        branch.add_leaf(Leaf::new("l"));
        assert!(branch.remove_leaf("b").is_none());
        assert!(branch.remove_branch("l").is_none());
        assert!(branch.remove_branch("b").is_some());
        assert!(branch.remove_leaf("l").is_some());
        assert!(branch.is_empty());
    }

    #[test]
    fn rename_preserves_subtree() {
        let mut branch = Branch::new("parent");
        let mut child = Branch::new("old");
        child.add_leaf(Leaf::new("kept"));
        branch.add_branch(child);
        assert!(branch.rename_child("old", "new"));
        assert!(branch.get_branch("new").unwrap().get_leaf("kept").is_some());
        assert!(!branch.has_child("old"));
    }

    #[test]
    fn rename_refuses_collision() {
        let mut branch = Branch::new("parent");
        branch.add_leaf(Leaf::new("a"));
        branch.add_leaf(Leaf::new("b"));
        assert!(!branch.rename_child("a", "b"));
        assert!(!branch.rename_child("missing", "c"));
    }

    #[test]
    fn name_listings_are_sorted() {
        let mut branch = Branch::new("parent");
        branch.add_branch(Branch::new("zebra"));
        branch.add_branch(Branch::new("aardvark"));
        branch.add_leaf(Leaf::new("middle"));
        assert_eq!(branch.branch_names(), vec!["aardvark", "zebra"]);
        assert_eq!(branch.leaf_names(), vec!["middle"]);
    }

    #[test]
    fn graft_seeds_cover_every_node() {
        let mut branch = Branch::new("sub");
        branch.add_leaf(Leaf::with_value(
            "data",
            values![3.14],
            chrono::Utc::now(),
        ));
        branch.add_leaf(Leaf::new("marker"));
        branch.add_branch(Branch::new("inner"));

        let mut seeds = Vec::new();
        branch.graft_seeds("/sub", chrono::Utc::now(), &mut seeds);
        // add_branch(/sub), add_leaf(/sub/data), set_leaf(/sub/data),
        // add_branch(/sub/inner), add_leaf(/sub/marker)
        assert_eq!(seeds.len(), 5);
    }
}

//! Structural queries and mutations over a [`GroupTree`].
//!
//! Every walk consults an [`Exclusions`] set: when a visited group's name is
//! excluded, the group itself still takes part but its subtree is skipped.
//! The walks keep their own stacks instead of recursing.

use crate::smartschool::api::config::Exclusions;
use crate::smartschool::api::model::{GroupId, GroupTree};

/// Finds the first group named `name` in pre-order, starting at `from`.
pub fn find(tree: &GroupTree, from: GroupId, exclusions: &Exclusions, name: &str) -> Option<GroupId> {
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        let Some(node) = tree.try_get(id) else {
            continue;
        };
        if node.group.name == name {
            return Some(id);
        }
        if exclusions.contains(&node.group.name) {
            continue;
        }
        stack.extend(tree.children(id).iter().rev().copied());
    }
    None
}

/// Counts the groups in the subtree of `from`. With `classes_only` only
/// official groups add to the total, but their children are still visited.
/// An excluded group contributes nothing, not even itself.
pub fn count(tree: &GroupTree, from: GroupId, exclusions: &Exclusions, classes_only: bool) -> usize {
    let mut total = 0;
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        let Some(node) = tree.try_get(id) else {
            continue;
        };
        if exclusions.contains(&node.group.name) {
            continue;
        }
        if !classes_only || node.group.official {
            total += 1;
        }
        stack.extend_from_slice(tree.children(id));
    }
    total
}

/// Counts the members loaded into the subtree of `from`.
///
/// A child handle that no longer resolves is logged and skipped; its
/// siblings still contribute.
pub fn count_members(tree: &GroupTree, from: GroupId, exclusions: &Exclusions) -> usize {
    let mut total = 0;
    let mut stack = vec![(from, None)];
    while let Some((id, parent)) = stack.pop() {
        let Some(node) = tree.try_get(id) else {
            let parent_name = parent
                .and_then(|parent| tree.try_get(parent))
                .map(|node| node.group.name.as_str())
                .unwrap_or_default();
            tracing::error!(group = %id, parent = parent_name, "cannot count members of unknown group");
            continue;
        };
        if exclusions.contains(&node.group.name) {
            continue;
        }
        total += node.members.len();
        stack.extend(tree.children(id).iter().map(|child| (*child, Some(id))));
    }
    total
}

/// Orders every child list in the subtree of `from` by name, using plain
/// ordinal comparison.
pub fn sort(tree: &mut GroupTree, from: GroupId) {
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        if !tree.contains(id) {
            continue;
        }
        let Some(mut children) = tree.get_mut(id).children.take() else {
            continue;
        };
        children.sort_by(|lhs, rhs| tree.group(*lhs).name.cmp(&tree.group(*rhs).name));
        stack.extend_from_slice(&children);
        tree.get_mut(id).children = Some(children);
    }
}

/// Lists the subtree of `from` with every group after its children. An
/// excluded group appears without its subtree.
pub fn flatten(tree: &GroupTree, from: GroupId, exclusions: &Exclusions) -> Vec<GroupId> {
    let mut list = Vec::new();
    let mut stack = vec![(from, false)];
    while let Some((id, expanded)) = stack.pop() {
        let Some(node) = tree.try_get(id) else {
            continue;
        };
        if expanded || exclusions.contains(&node.group.name) {
            list.push(id);
            continue;
        }
        stack.push((id, true));
        stack.extend(tree.children(id).iter().rev().map(|child| (*child, false)));
    }
    list
}

/// Returns true when one of the ancestors of `id` is named `name`.
pub fn has_ancestor(tree: &GroupTree, id: GroupId, name: &str) -> bool {
    let mut current = tree.parent(id);
    while let Some(parent) = current {
        if tree.group(parent).name == name {
            return true;
        }
        current = tree.parent(parent);
    }
    false
}

/// Number of levels in the subtree of `from`, counting `from` itself.
pub fn depth(tree: &GroupTree, from: GroupId) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(from, 1)];
    while let Some((id, level)) = stack.pop() {
        if !tree.contains(id) {
            continue;
        }
        deepest = deepest.max(level);
        stack.extend(tree.children(id).iter().map(|child| (*child, level + 1)));
    }
    deepest
}

use std::fmt;

use serde::{Deserialize, Serialize};

mod account;

pub use account::Account;

/// Handle to a node stored in a [`GroupTree`].
///
/// Handles are only meaningful for the tree that produced them. A reload
/// replaces the whole tree, so handles kept from before become stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

impl GroupId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of organisational unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupKind {
    /// Free-form group.
    Group,
    /// Class group, usually official.
    Class,
    /// Anything the platform reported that is neither.
    #[default]
    Invalid,
}

impl GroupKind {
    /// Maps the single-letter code used in the group markup.
    pub fn from_markup(code: &str) -> Self {
        match code {
            "G" => GroupKind::Group,
            "K" => GroupKind::Class,
            _ => GroupKind::Invalid,
        }
    }

    /// Maps the name stored in snapshot records.
    pub fn from_snapshot(name: &str) -> Self {
        match name {
            "Group" => GroupKind::Group,
            "Class" => GroupKind::Class,
            _ => GroupKind::Invalid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupKind::Group => "Group",
            GroupKind::Class => "Class",
            GroupKind::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar attributes of a group or class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    /// Lookup key inside a tree. Uniqueness is assumed, not enforced.
    pub name: String,
    /// The platform rejects saves with an empty description.
    pub description: String,
    pub kind: GroupKind,
    /// Identifier assigned by the platform.
    pub code: String,
    /// Schedule linking identifier.
    pub untis: String,
    pub visible: bool,
    /// Official groups are real classes and need admin and institute numbers.
    pub official: bool,
    /// Label co-accounts see for this group.
    pub co_account_label: String,
    pub admin_number: i32,
    pub institute_number: String,
    /// Homeroom teachers. Read-only: the platform offers no way to save them.
    pub titulars: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }
}

/// A group together with its position in the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupNode {
    pub group: Group,
    /// Non-owning back-reference. Never serialized.
    pub parent: Option<GroupId>,
    /// `None` when the node never had a child list, which is distinct from
    /// an empty list.
    pub children: Option<Vec<GroupId>>,
    /// Accounts loaded for this node. Filled lazily, never by ingestion.
    pub members: Vec<Account>,
}

/// Arena holding a group hierarchy.
///
/// Every node owns its subtree through child handles; the parent handle is
/// a plain back-reference. Detached nodes keep their slot but are no longer
/// reachable from the root.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTree {
    nodes: Vec<GroupNode>,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTree {
    /// Creates a tree whose root is a synthetic wrapper without attributes.
    pub fn new() -> Self {
        Self::with_root(Group::default())
    }

    /// Creates a tree whose root is the given group.
    pub fn with_root(group: Group) -> Self {
        Self {
            nodes: vec![GroupNode {
                group,
                ..GroupNode::default()
            }],
        }
    }

    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    /// First child of the root. For ingested trees this is the usable top
    /// group, since the root itself is only a wrapper.
    pub fn top_level(&self) -> Option<GroupId> {
        self.children(self.root()).first().copied()
    }

    /// Number of slots, including detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: GroupId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn try_get(&self, id: GroupId) -> Option<&GroupNode> {
        self.nodes.get(id.0)
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics when `id` was not produced by this tree.
    pub fn get(&self, id: GroupId) -> &GroupNode {
        &self.nodes[id.0]
    }

    /// Mutable counterpart of [`GroupTree::get`].
    pub fn get_mut(&mut self, id: GroupId) -> &mut GroupNode {
        &mut self.nodes[id.0]
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.get(id).group
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.get_mut(id).group
    }

    pub fn parent(&self, id: GroupId) -> Option<GroupId> {
        self.try_get(id).and_then(|node| node.parent)
    }

    /// Child handles of `id`, empty when the node has no child list.
    pub fn children(&self, id: GroupId) -> &[GroupId] {
        self.try_get(id)
            .and_then(|node| node.children.as_deref())
            .unwrap_or(&[])
    }

    /// Appends a new child below `parent`, creating the child list when it
    /// is absent.
    pub fn add_child(&mut self, parent: GroupId, group: Group) -> GroupId {
        let id = GroupId(self.nodes.len());
        self.nodes.push(GroupNode {
            group,
            parent: Some(parent),
            ..GroupNode::default()
        });
        self.nodes[parent.0]
            .children
            .get_or_insert_with(Vec::new)
            .push(id);
        id
    }

    /// Removes `id` from its parent's child list. Returns `false` for the
    /// root or a node that was already detached.
    pub fn detach(&mut self, id: GroupId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let Some(children) = self.nodes[parent.0].children.as_mut() else {
            return false;
        };
        let before = children.len();
        children.retain(|child| *child != id);
        let removed = children.len() != before;
        if removed {
            self.nodes[id.0].parent = None;
        }
        removed
    }
}

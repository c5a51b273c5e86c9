use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::smartschool::api::config::Exclusions;
use crate::smartschool::api::error::{ApiError, Result};
use crate::smartschool::api::model::{Group, GroupId, GroupKind, GroupTree};
use crate::smartschool::api::tree;

/// Stored form of one group and, optionally, its children.
///
/// Members and titulars are not part of a snapshot. A missing `Children`
/// field means the group had no child list at all, which is kept distinct
/// from an empty array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotRecord {
    pub name: String,
    pub description: String,
    pub code: String,
    pub official: bool,
    pub visible: bool,
    #[serde(rename = "Type")]
    pub kind: String,
    pub untis: String,
    pub institute_number: String,
    pub admin_number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SnapshotRecord>>,
}

impl SnapshotRecord {
    fn into_parts(self) -> (Group, Option<Vec<SnapshotRecord>>) {
        let group = Group {
            name: self.name,
            description: self.description,
            kind: GroupKind::from_snapshot(&self.kind),
            code: self.code,
            untis: self.untis,
            visible: self.visible,
            official: self.official,
            admin_number: self.admin_number,
            institute_number: self.institute_number,
            ..Group::default()
        };
        (group, self.children)
    }
}

/// Deepest group nesting a snapshot may hold, counting the snapshot root.
///
/// Each level costs serde_json an object and an array of its recursion
/// budget, so deeper files could be written but not read back.
pub const MAX_DEPTH: usize = 60;

/// Builds the record for `id` and its whole subtree.
///
/// Records are assembled bottom-up from the post-order of the subtree.
/// Fails when `id` is unknown or the subtree is deeper than [`MAX_DEPTH`].
pub fn to_record(tree: &GroupTree, id: GroupId) -> Result<SnapshotRecord> {
    if !tree.contains(id) {
        return Err(ApiError::UnknownGroup(id.index()));
    }
    check_depth(tree::depth(tree, id))?;

    let mut built: HashMap<GroupId, SnapshotRecord> = HashMap::new();
    for current in tree::flatten(tree, id, &Exclusions::new()) {
        let node = tree.get(current);
        let children = node.children.as_ref().map(|children| {
            children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect()
        });
        built.insert(current, record_of(&node.group, children));
    }
    built
        .remove(&id)
        .ok_or(ApiError::UnknownGroup(id.index()))
}

/// Serialises `id` and its subtree into a JSON value.
pub fn encode(tree: &GroupTree, id: GroupId) -> Result<Value> {
    Ok(serde_json::to_value(to_record(tree, id)?)?)
}

/// Rebuilds a standalone tree whose root is the group stored in `value`.
pub fn decode(value: &Value) -> Result<GroupTree> {
    check_depth(record_depth(value))?;
    let (group, children) = parse_record(value)?.into_parts();
    let mut tree = GroupTree::with_root(group);
    let root = tree.root();
    attach(&mut tree, root, children);
    Ok(tree)
}

/// Decodes `value` and attaches the result below `parent` in an existing
/// tree. Returns the handle of the decoded group.
pub fn decode_into(tree: &mut GroupTree, parent: GroupId, value: &Value) -> Result<GroupId> {
    check_depth(record_depth(value))?;
    let (group, children) = parse_record(value)?.into_parts();
    let id = tree.add_child(parent, group);
    attach(tree, id, children);
    Ok(id)
}

/// Writes the snapshot of `id` as pretty-printed JSON.
pub fn write_snapshot(path: &Path, tree: &GroupTree, id: GroupId) -> Result<()> {
    let json = serde_json::to_string_pretty(&to_record(tree, id)?)?;
    fs::write(path, json)?;
    Ok(())
}

/// Reads a snapshot file written by [`write_snapshot`]. Files nested deeper
/// than [`MAX_DEPTH`] are rejected.
pub fn read_snapshot(path: &Path) -> Result<GroupTree> {
    if !path.exists() {
        return Err(ApiError::MissingInput(path.to_path_buf()));
    }
    let source = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&source)?;
    decode(&value)
}

fn record_of(group: &Group, children: Option<Vec<SnapshotRecord>>) -> SnapshotRecord {
    SnapshotRecord {
        name: group.name.clone(),
        description: group.description.clone(),
        code: group.code.clone(),
        official: group.official,
        visible: group.visible,
        kind: group.kind.as_str().to_string(),
        untis: group.untis.clone(),
        institute_number: group.institute_number.clone(),
        admin_number: group.admin_number,
        children,
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(ApiError::Snapshot(format!(
            "groups are nested more than {MAX_DEPTH} levels deep"
        )));
    }
    Ok(())
}

/// Nesting depth of a record value, following `Children` arrays. Stops
/// counting once the limit is passed.
fn record_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(value, 1)];
    while let Some((record, level)) = stack.pop() {
        deepest = deepest.max(level);
        if deepest > MAX_DEPTH {
            break;
        }
        if let Some(children) = record.get("Children").and_then(Value::as_array) {
            stack.extend(children.iter().map(|child| (child, level + 1)));
        }
    }
    deepest
}

fn parse_record(value: &Value) -> Result<SnapshotRecord> {
    if !value.is_object() {
        return Err(ApiError::Snapshot("expected a JSON object".into()));
    }
    SnapshotRecord::deserialize(value).map_err(|err| ApiError::Snapshot(err.to_string()))
}

fn attach(tree: &mut GroupTree, id: GroupId, children: Option<Vec<SnapshotRecord>>) {
    let mut stack = vec![(id, children)];
    while let Some((parent, children)) = stack.pop() {
        let Some(children) = children else {
            continue;
        };
        tree.get_mut(parent).children = Some(Vec::with_capacity(children.len()));
        for record in children {
            let (group, grandchildren) = record.into_parts();
            let child = tree.add_child(parent, group);
            stack.push((child, grandchildren));
        }
    }
}

//! Structural equivalence between two group trees.

use crate::smartschool::api::model::{Group, GroupId, GroupTree};

/// Outcome of [`equals`]: either equal, or the description of the first
/// difference that was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    differences: Vec<String>,
}

impl Comparison {
    fn mismatch(description: String) -> Self {
        tracing::debug!(difference = %description, "group trees differ");
        Self {
            differences: vec![description],
        }
    }

    pub fn is_equal(&self) -> bool {
        self.differences.is_empty()
    }

    /// Human-readable trail of what differed. Meant for diagnostics only.
    pub fn differences(&self) -> &[String] {
        &self.differences
    }

    pub fn into_differences(self) -> Vec<String> {
        self.differences
    }
}

/// Compares the group `lhs_id` of `lhs` with the group `rhs_id` of `rhs`.
///
/// Attributes are checked in a fixed order and the first mismatch ends the
/// comparison. With `recursive`, child lists must both be absent or have the
/// same length, and children are compared by position, so order matters.
pub fn equals(
    lhs: &GroupTree,
    lhs_id: GroupId,
    rhs: &GroupTree,
    rhs_id: GroupId,
    recursive: bool,
) -> Comparison {
    let mut stack = vec![(lhs_id, rhs_id)];
    while let Some((left_id, right_id)) = stack.pop() {
        let (Some(left), Some(right)) = (lhs.try_get(left_id), rhs.try_get(right_id)) else {
            return Comparison::mismatch(format!(
                "unknown group handle {left_id} or {right_id}"
            ));
        };

        if let Some(difference) = scalar_difference(&left.group, &right.group) {
            return Comparison::mismatch(difference);
        }

        if !recursive {
            continue;
        }

        let name = &left.group.name;
        match (&left.children, &right.children) {
            (None, None) => {}
            (None, Some(_)) => {
                return Comparison::mismatch(format!(
                    "group '{name}' has no children, other has"
                ));
            }
            (Some(_), None) => {
                return Comparison::mismatch(format!(
                    "group '{name}' has children, other has none"
                ));
            }
            (Some(mine), Some(theirs)) if mine.len() != theirs.len() => {
                return Comparison::mismatch(format!(
                    "group '{name}' has {} children, other has {}",
                    mine.len(),
                    theirs.len()
                ));
            }
            (Some(mine), Some(theirs)) => {
                stack.extend(
                    mine.iter()
                        .zip(theirs)
                        .rev()
                        .map(|(left, right)| (*left, *right)),
                );
            }
        }
    }

    Comparison::default()
}

fn scalar_difference(left: &Group, right: &Group) -> Option<String> {
    if left.name != right.name {
        return Some(format!(
            "group Name differs: '{}' other: '{}'",
            left.name, right.name
        ));
    }

    macro_rules! check {
        ($label:literal, $field:ident) => {
            if left.$field != right.$field {
                return Some(format!(
                    "group '{}' {} differs: '{}' other: '{}'",
                    left.name, $label, left.$field, right.$field
                ));
            }
        };
    }

    check!("Description", description);
    check!("Code", code);
    check!("Official", official);
    check!("Visible", visible);
    check!("Type", kind);
    check!("Untis", untis);
    check!("InstituteNumber", institute_number);
    check!("AdminNumber", admin_number);
    None
}

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::smartschool::api::error::{ApiError, Result};

/// Names of groups whose subgroups are skipped by search, counting and
/// flattening. The named group itself is still visited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exclusions(BTreeSet<String>);

impl Exclusions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Exclusions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// School-specific policy consumed by the group manager.
///
/// ```json
/// {
///   "discard_subgroups": ["Personeel"],
///   "student_years": [],
///   "student_grades": ["Graad1", "Graad2", "Graad3"],
///   "student_path": "Leerlingen"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupPolicy {
    /// Exclusion set applied to every tree operation.
    pub discard_subgroups: Exclusions,
    /// One group name per academic year, first to seventh.
    pub student_years: Vec<String>,
    /// One group name per grade: years 1-2, 3-4 and 5-7.
    pub student_grades: Vec<String>,
    /// Group holding all classes when neither list is configured.
    pub student_path: String,
}

pub const YEAR_COUNT: usize = 7;
pub const GRADE_COUNT: usize = 3;

impl GroupPolicy {
    /// Reads a policy from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ApiError::MissingInput(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path)?;
        let policy: GroupPolicy = serde_json::from_str(&source)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Rejects year or grade lists that are filled in but have the wrong
    /// length. Empty lists are fine and mean "not configured".
    pub fn validate(&self) -> Result<()> {
        if !self.student_years.is_empty() && self.student_years.len() != YEAR_COUNT {
            return Err(ApiError::Config(format!(
                "student_years needs {YEAR_COUNT} names, found {}",
                self.student_years.len()
            )));
        }
        if !self.student_grades.is_empty() && self.student_grades.len() != GRADE_COUNT {
            return Err(ApiError::Config(format!(
                "student_grades needs {GRADE_COUNT} names, found {}",
                self.student_grades.len()
            )));
        }
        Ok(())
    }

    /// Name of the group a class should live under, derived from the year
    /// digit its name starts with. Returns an empty string when the name
    /// does not start with a year between 1 and 7.
    pub fn logical_parent(&self, class_name: &str) -> String {
        let Some(year) = class_name
            .chars()
            .next()
            .and_then(|first| first.to_digit(10))
        else {
            tracing::error!(class = class_name, "class name does not start with a year digit");
            return String::new();
        };

        if !(1..=YEAR_COUNT as u32).contains(&year) {
            return String::new();
        }

        if self.student_years.len() == YEAR_COUNT {
            return self.student_years[year as usize - 1].clone();
        }

        if self.student_grades.len() == GRADE_COUNT {
            let grade = match year {
                1 | 2 => 0,
                3 | 4 => 1,
                _ => 2,
            };
            return self.student_grades[grade].clone();
        }

        self.student_path.clone()
    }
}

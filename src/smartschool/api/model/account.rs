use serde::{Deserialize, Serialize};

/// Account record as returned by the platform's group member listing.
///
/// The group core treats accounts as opaque; only the identifying fields are
/// kept here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Login name.
    #[serde(rename = "gebruikersnaam")]
    pub uid: String,
    /// Internal platform number. Absent for some account types.
    #[serde(rename = "internnummer", default)]
    pub account_id: Option<String>,
    #[serde(rename = "voornaam", default)]
    pub given_name: String,
    #[serde(rename = "naam", default)]
    pub surname: String,
    /// Raw base role code ("1" student, "2" teacher, "3" director).
    #[serde(rename = "basisrol", default)]
    pub role: String,
    /// Name of the group this record was loaded for.
    #[serde(skip)]
    pub group: String,
}

impl Account {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }
}

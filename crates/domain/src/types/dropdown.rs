//! Reference values for the risk form's select fields

use serde::{Deserialize, Serialize};

/// One selectable value in a dropdown category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownValue {
    pub id: i64,
    pub category: String,
    pub value: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "active")]
    pub is_active: bool,
}

const fn active() -> bool {
    true
}

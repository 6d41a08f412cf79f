use serde::{Deserialize, Serialize};

/// receipt numbers are assigned by the payment server (creation-time token)
pub type ReceiptNo = String;

/// comparable form of a class label: all whitespace stripped, lowercased.
/// "Class 7 A" and "class7a" refer to the same class in the source sheets.
pub fn class_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// comparable form of an admission number: trimmed, lowercased
pub fn adm_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// comparable form of a fee head name: trimmed only, case preserved
pub fn head_key(raw: &str) -> String {
    raw.trim().to_string()
}

/// check two class labels for equality under normalization
pub fn same_class(a: &str, b: &str) -> bool {
    class_key(a) == class_key(b)
}

/// user role attached to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Account,
    Teacher,
}

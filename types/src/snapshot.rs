use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::FieldId;
use crate::value::FieldValue;

/// Point-in-time capture of a form's field values.
///
/// The capture is stored as a canonical sorted-key JSON string, so two
/// snapshots compare equal iff they hold the same field values, regardless of
/// the order fields were visited. The dirty check is a plain string
/// comparison of a baseline capture against the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSnapshot {
    canonical: String,
}

impl FormSnapshot {
    /// Capture the given fields into canonical form.
    pub fn capture<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a FieldId, &'a FieldValue)>,
    {
        // BTreeMap serializes in key order, which is the whole point.
        let ordered: BTreeMap<&FieldId, &FieldValue> = fields.into_iter().collect();
        let canonical = serde_json::to_string(&ordered)
            .expect("string and bool values always serialize");
        Self { canonical }
    }

    /// Snapshot of a form with no tracked fields.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            canonical: String::from("{}"),
        }
    }

    /// Copy of this snapshot with a single field replaced.
    ///
    /// Fields other than `field` keep their captured values, so a baseline can
    /// track a server-confirmed change without discarding the rest of the
    /// capture. The captured values stay as raw JSON; `FieldValue` itself is
    /// never read back.
    #[must_use]
    pub fn with_field(&self, field: &FieldId, value: &FieldValue) -> Self {
        let mut ordered: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&self.canonical).expect("canonical capture always re-parses");
        let raw = serde_json::to_value(value).expect("string and bool values always serialize");
        ordered.insert(field.as_str().to_owned(), raw);
        let canonical = serde_json::to_string(&ordered)
            .expect("string and bool values always serialize");
        Self { canonical }
    }

    #[must_use]
    pub fn as_json(&self) -> &str {
        &self.canonical
    }
}

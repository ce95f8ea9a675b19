//! Field Explorer
//!
//! Search over the leaves of a test-fetched document and selection
//! toggling, as used while configuring a widget.

use crate::json::FlattenedField;
use crate::widget::SelectedField;
use serde_json::Value;

const PREVIEW_LEN: usize = 50;

/// Leaves whose path contains `term`, case-insensitively
///
/// An empty term matches every field.
pub fn search<'a>(fields: &'a [FlattenedField], term: &str) -> Vec<&'a FlattenedField> {
    let needle = term.to_lowercase();
    fields
        .iter()
        .filter(|f| f.path.to_lowercase().contains(&needle))
        .collect()
}

/// Add the field to the selection, or remove it if its path is already selected
///
/// Returns `true` if the field is selected afterwards.
pub fn toggle_field(selected: &mut Vec<SelectedField>, field: SelectedField) -> bool {
    if let Some(pos) = selected.iter().position(|f| f.path == field.path) {
        selected.remove(pos);
        false
    } else {
        selected.push(field);
        true
    }
}

/// Compact JSON of a value, cut to 50 characters with a trailing `...`
pub fn preview(value: &Value) -> String {
    let encoded = value.to_string();
    if encoded.chars().count() > PREVIEW_LEN {
        let cut: String = encoded.chars().take(PREVIEW_LEN).collect();
        format!("{}...", cut)
    } else {
        encoded
    }
}

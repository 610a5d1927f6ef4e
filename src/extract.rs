//! Flattening of one collection element into searchable text.
//!
//! Elements are loosely shaped JSON objects. Only a fixed set of
//! text-bearing fields contributes; everything else rides along untouched
//! in the index entry.

use serde_json::{Map, Value};

use crate::collections::TOOLKIT_TYPE_FIELD;

/// One element of a collection array.
pub type Element = Map<String, Value>;

/// Human label preferred over the machine-style `name`.
pub const DISPLAY_NAME_FIELD: &str = "displayName";
pub const NAME_FIELD: &str = "name";

/// Scalar fields appended after the name, in this order.
pub const SCALAR_FIELDS: &[&str] = &[
    "title",
    "description",
    "extendedDescription",
    "shortName",
    "id",
    "term",
    "definition",
    "category",
    "owner",
];

/// Fields whose array values contribute one fragment per item.
pub const LIST_FIELDS: &[&str] = &["domain", "tags", "changes", "taggedModels"];

/// Candidate id fields, highest priority first.
pub const ID_FIELDS: &[&str] = &["id", "shortName", "name", "term"];

/// Render a value as a text fragment.
///
/// Null, `false`, zero, and empty strings/arrays/objects contribute nothing.
pub fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Build the lowercase searchable text of an element.
///
/// Returns an empty string when no contributing field yields a token.
/// Callers decide whether such elements are indexed.
pub fn searchable_text(element: &Element) -> String {
    let mut parts: Vec<String> = Vec::new();

    // Display-name items never index their machine-style `name`.
    let label_field = if has_display_name(element) {
        DISPLAY_NAME_FIELD
    } else {
        NAME_FIELD
    };
    if let Some(label) = element.get(label_field).and_then(render) {
        parts.push(label);
    }

    for field in SCALAR_FIELDS {
        if let Some(fragment) = element.get(*field).and_then(render) {
            parts.push(fragment);
        }
    }

    for field in LIST_FIELDS {
        if let Some(Value::Array(items)) = element.get(*field) {
            parts.extend(items.iter().filter_map(render));
        }
    }

    let text = parts.join(" ").to_lowercase();
    if text.split_whitespace().next().is_none() {
        return String::new();
    }
    text
}

/// Toolkit elements, and anything carrying a `displayName` key (even an
/// empty one), are labelled by their display name only.
pub fn has_display_name(element: &Element) -> bool {
    element.contains_key(DISPLAY_NAME_FIELD)
        || element.contains_key(TOOLKIT_TYPE_FIELD)
}

/// Derive the document id: `id`, then `shortName`, `name`, `term`.
///
/// Numbers are accepted (application ids are integers). Returns `None`
/// when every candidate is missing or blank.
pub fn document_id(element: &Element) -> Option<String> {
    ID_FIELDS.iter().find_map(|field| match element.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn element(value: Value) -> Element {
        match value {
            Value::Object(map) => map,
            _ => panic!("test element must be an object"),
        }
    }

    #[test]
    fn display_name_wins_over_name() {
        let e = element(json!({
            "name": "data_validation_utility",
            "displayName": "Data Validation Utility"
        }));
        let text = searchable_text(&e);
        assert!(text.contains("data validation utility"));
        assert!(
            !text
                .split_whitespace()
                .any(|t| t == "data_validation_utility")
        );
    }

    #[test]
    fn empty_display_name_does_not_fall_back_to_name() {
        let e = element(json!({
            "name": "customer_model",
            "displayName": "",
            "description": "Customer records"
        }));
        assert_eq!(searchable_text(&e), "customer records");
    }

    #[test]
    fn toolkit_tag_suppresses_name() {
        let e = element(json!({
            "id": "fn_001",
            "name": "data_validation_utility",
            "description": "checks rows",
            "_toolkit_type": "functions"
        }));
        let text = searchable_text(&e);
        assert_eq!(text, "checks rows fn_001");
        assert!(
            !text
                .split_whitespace()
                .any(|t| t == "data_validation_utility")
        );
    }

    #[test]
    fn plain_elements_use_name() {
        let e = element(json!({"name": "Customer Model"}));
        assert!(!has_display_name(&e));
        assert_eq!(searchable_text(&e), "customer model");
    }

    #[test]
    fn fields_are_joined_in_order_and_lowercased() {
        let e = element(json!({
            "id": "m1",
            "shortName": "CUST",
            "name": "Customer Model",
            "description": "Holds customer PII"
        }));
        assert_eq!(
            searchable_text(&e),
            "customer model holds customer pii cust m1"
        );
    }

    #[test]
    fn list_fields_contribute_each_item() {
        let e = element(json!({
            "name": "Orders",
            "domain": ["Sales", "Finance"],
            "tags": ["pii"],
            "changes": ["Added column"],
            "taggedModels": ["CUST"]
        }));
        assert_eq!(
            searchable_text(&e),
            "orders sales finance pii added column cust"
        );
    }

    #[test]
    fn list_field_that_is_not_an_array_is_ignored() {
        let e = element(json!({"name": "Orders", "domain": "Sales"}));
        assert_eq!(searchable_text(&e), "orders");
    }

    #[test]
    fn term_and_definition_are_included() {
        let e = element(json!({
            "term": "Golden Record",
            "definition": "The single trusted version"
        }));
        assert_eq!(
            searchable_text(&e),
            "golden record the single trusted version"
        );
    }

    #[test]
    fn falsy_values_contribute_nothing() {
        let e = element(json!({
            "name": null,
            "description": "",
            "category": false,
            "owner": 0,
            "tags": []
        }));
        assert_eq!(searchable_text(&e), "");
    }

    #[test]
    fn whitespace_only_text_counts_as_empty() {
        let e = element(json!({"description": "   "}));
        assert_eq!(searchable_text(&e), "");
    }

    #[test]
    fn unrelated_fields_are_ignored() {
        let e = element(json!({"version": "1.0.0", "meta": {"tier": "gold"}}));
        assert_eq!(searchable_text(&e), "");
    }

    #[test]
    fn id_priority_order() {
        let e = element(json!({"shortName": "CUST", "name": "Customer"}));
        assert_eq!(document_id(&e).as_deref(), Some("CUST"));

        let e = element(json!({"id": "m1", "shortName": "CUST"}));
        assert_eq!(document_id(&e).as_deref(), Some("m1"));

        let e = element(json!({"term": "Golden Record"}));
        assert_eq!(document_id(&e).as_deref(), Some("Golden Record"));
    }

    #[test]
    fn blank_id_falls_through() {
        let e = element(json!({"id": "", "name": "Customer"}));
        assert_eq!(document_id(&e).as_deref(), Some("Customer"));
    }

    #[test]
    fn numeric_id_is_rendered() {
        let e = element(json!({"id": 7, "name": "CRM"}));
        assert_eq!(document_id(&e).as_deref(), Some("7"));
    }

    #[test]
    fn missing_id_fields() {
        let e = element(json!({"description": "orphan"}));
        assert_eq!(document_id(&e), None);
    }
}

//! The fixed registry of catalog collections and the blob shapes they use.
//!
//! A collection blob is either a bare array of elements or a mapping that
//! holds the array under a known key. The toolkit collection nests one level
//! further: `{"toolkit": {"functions": [...], "containers": [...]}}`.

use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    extract::{self, Element},
};

/// Tag added to flattened toolkit elements naming their sub-array.
pub const TOOLKIT_TYPE_FIELD: &str = "_toolkit_type";

/// Field a new toolkit element uses to pick its sub-array.
pub const TOOLKIT_SECTION_FIELD: &str = "type";

const DEFAULT_TOOLKIT_SECTION: &str = "functions";

/// Array keys accepted when a mapping blob is read.
pub const RECOGNIZED_ARRAY_KEYS: &[&str] = &[
    "models",
    "dataAgreements",
    "agreements",
    "domains",
    "applications",
    "reference",
    "items",
    "toolkit",
    "policies",
    "lexicon",
    "terms",
];

/// How ids are generated for elements created without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// Integer ids, one past the largest in use.
    Numeric,
    /// `<prefix>NNN`, one past the largest numeric suffix in use.
    Prefixed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub name: &'static str,
    pub id_prefix: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub document_type: &'static str,
    pub file_name: &'static str,
    pub array_key: &'static str,
    pub id_scheme: IdScheme,
    /// Non-empty only for nested collections.
    pub sections: &'static [Section],
}

const TOOLKIT_SECTIONS: &[Section] = &[
    Section {
        name: "functions",
        id_prefix: "fn_",
    },
    Section {
        name: "containers",
        id_prefix: "cont_",
    },
    Section {
        name: "infrastructure",
        id_prefix: "infra_",
    },
    Section {
        name: "terraform",
        id_prefix: "tf_",
    },
];

const fn flat(
    document_type: &'static str,
    file_name: &'static str,
    array_key: &'static str,
    id_scheme: IdScheme,
) -> CollectionSpec {
    CollectionSpec {
        document_type,
        file_name,
        array_key,
        id_scheme,
        sections: &[],
    }
}

use IdScheme::{Numeric, Prefixed};

/// Every collection the index understands, in rebuild order.
pub const COLLECTIONS: &[CollectionSpec] = &[
    flat("models", "dataModels.json", "models", Numeric),
    flat(
        "dataAgreements",
        "dataAgreements.json",
        "agreements",
        Prefixed("agreement-"),
    ),
    flat("domains", "dataDomains.json", "domains", Prefixed("domain-")),
    flat("applications", "applications.json", "applications", Numeric),
    flat("reference", "reference.json", "items", Prefixed("ref-")),
    CollectionSpec {
        document_type: "toolkit",
        file_name: "toolkit.json",
        array_key: "toolkit",
        id_scheme: Prefixed("fn_"),
        sections: TOOLKIT_SECTIONS,
    },
    flat("policies", "dataPolicies.json", "policies", Prefixed("policy-")),
    flat("lexicon", "lexicon.json", "terms", Prefixed("term-")),
    flat("glossary", "glossary.json", "terms", Prefixed("glossary-")),
];

pub fn find(document_type: &str) -> Option<&'static CollectionSpec> {
    COLLECTIONS.iter().find(|c| c.document_type == document_type)
}

/// Like [`find`], but unknown types are an error.
pub fn lookup(document_type: &str) -> Result<&'static CollectionSpec> {
    find(document_type).ok_or_else(|| Error::NotFound {
        kind: "collection type",
        name: document_type.to_string(),
    })
}

/// Position of one element inside a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub section: Option<&'static str>,
    pub index: usize,
}

impl CollectionSpec {
    pub fn is_sectioned(&self) -> bool {
        !self.sections.is_empty()
    }

    pub fn section(&self, name: &str) -> Option<&'static Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// A blob with no elements, in this collection's canonical shape.
    pub fn empty_blob(&self) -> Value {
        let mut root = Map::new();
        let inner = if self.is_sectioned() {
            Value::Object(Map::new())
        } else {
            Value::Array(Vec::new())
        };
        root.insert(self.array_key.to_string(), inner);
        Value::Object(root)
    }

    /// Flatten a blob into its elements.
    ///
    /// Non-object array items are dropped. Toolkit elements come back tagged
    /// with [`TOOLKIT_TYPE_FIELD`].
    pub fn elements(&self, blob: &Value) -> Result<Vec<Element>> {
        if self.is_sectioned() {
            return self.sectioned_elements(blob);
        }

        let items = match blob {
            Value::Array(items) => items,
            Value::Object(map) => self.flat_array(map).ok_or_else(|| {
                self.shape_error("no recognized array key")
            })?,
            _ => return Err(self.shape_error("expected an array or object")),
        };

        Ok(items.iter().filter_map(as_element).collect())
    }

    fn sectioned_elements(&self, blob: &Value) -> Result<Vec<Element>> {
        let sections = self.sections_map(blob).ok_or_else(|| {
            self.shape_error("expected a mapping of named sub-arrays")
        })?;

        let mut out = Vec::new();
        for section in self.sections {
            let Some(Value::Array(items)) = sections.get(section.name) else {
                continue;
            };
            for item in items {
                if let Some(mut element) = as_element(item) {
                    element.insert(
                        TOOLKIT_TYPE_FIELD.to_string(),
                        Value::String(section.name.to_string()),
                    );
                    out.push(element);
                }
            }
        }
        Ok(out)
    }

    fn flat_array<'a>(&self, map: &'a Map<String, Value>) -> Option<&'a Vec<Value>> {
        std::iter::once(self.array_key)
            .chain(RECOGNIZED_ARRAY_KEYS.iter().copied())
            .find_map(|key| map.get(key).and_then(Value::as_array))
    }

    fn flat_key(&self, map: &Map<String, Value>) -> &'static str {
        std::iter::once(self.array_key)
            .chain(RECOGNIZED_ARRAY_KEYS.iter().copied())
            .find(|key| map.get(*key).is_some_and(Value::is_array))
            .unwrap_or(self.array_key)
    }

    /// The mapping holding the sub-arrays: either under `array_key`, or the
    /// blob itself when it already has section keys at the top level.
    fn sections_map<'a>(&self, blob: &'a Value) -> Option<&'a Map<String, Value>> {
        let root = blob.as_object()?;
        if let Some(inner) = root.get(self.array_key).and_then(Value::as_object) {
            return Some(inner);
        }
        self.sections
            .iter()
            .any(|s| root.contains_key(s.name))
            .then_some(root)
    }

    fn shape_error(&self, reason: &str) -> Error {
        Error::InvalidShape {
            collection: self.document_type.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Find an element by document id.
    pub fn locate(&self, blob: &Value, document_id: &str) -> Option<Location> {
        let matches = |item: &Value| {
            item.as_object()
                .and_then(extract::document_id)
                .is_some_and(|id| id == document_id)
        };

        // Last match wins, as it does on rebuild.
        if self.is_sectioned() {
            let sections = self.sections_map(blob)?;
            return self.sections.iter().rev().find_map(|section| {
                let items = sections.get(section.name)?.as_array()?;
                let index = items.iter().rposition(&matches)?;
                Some(Location {
                    section: Some(section.name),
                    index,
                })
            });
        }

        let items = match blob {
            Value::Array(items) => items,
            Value::Object(map) => self.flat_array(map)?,
            _ => return None,
        };
        let index = items.iter().rposition(&matches)?;
        Some(Location {
            section: None,
            index,
        })
    }

    /// Mutable access to the array that holds (or will hold) elements of
    /// `section`. Missing containers are created in the canonical shape.
    pub fn array_mut<'a>(
        &self,
        blob: &'a mut Value,
        section: Option<&str>,
    ) -> Result<&'a mut Vec<Value>> {
        if self.is_sectioned() {
            let name = section.ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} elements need a section",
                    self.document_type
                ))
            })?;
            let section = self.section(name).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown {} section '{name}'",
                    self.document_type
                ))
            })?;

            let nested_at_top = self.sections_map(blob).is_some()
                && blob
                    .as_object()
                    .is_some_and(|m| !m.contains_key(self.array_key));
            let root = blob
                .as_object_mut()
                .ok_or_else(|| self.shape_error("expected an object"))?;
            let sections = if nested_at_top {
                root
            } else {
                root.entry(self.array_key)
                    .or_insert_with(|| Value::Object(Map::new()))
                    .as_object_mut()
                    .ok_or_else(|| {
                        self.shape_error("sub-array container is not an object")
                    })?
            };
            return sections
                .entry(section.name)
                .or_insert_with(|| Value::Array(Vec::new()))
                .as_array_mut()
                .ok_or_else(|| self.shape_error("section is not an array"));
        }

        match blob {
            Value::Array(items) => Ok(items),
            Value::Object(map) => {
                let key = self.flat_key(map);
                map.entry(key)
                    .or_insert_with(|| Value::Array(Vec::new()))
                    .as_array_mut()
                    .ok_or_else(|| self.shape_error("array key is not an array"))
            }
            _ => Err(self.shape_error("expected an array or object")),
        }
    }

    /// Sub-array a new element belongs to, from its `type` field.
    pub fn section_for(&self, element: &Element) -> Result<Option<&'static str>> {
        if !self.is_sectioned() {
            return Ok(None);
        }
        let name = element
            .get(TOOLKIT_SECTION_FIELD)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TOOLKIT_SECTION);
        self.section(name).map(|s| Some(s.name)).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unknown {} section '{name}'",
                self.document_type
            ))
        })
    }

    /// Id scheme for new elements in `section` (or the collection).
    pub fn id_scheme(&self, section: Option<&str>) -> IdScheme {
        section
            .and_then(|name| self.section(name))
            .map(|s| Prefixed(s.id_prefix))
            .unwrap_or(self.id_scheme)
    }

    /// A fresh id for a new element of `section`, given the current blob.
    pub fn next_id(&self, blob: &Value, section: Option<&str>) -> Value {
        let elements = self.elements(blob).unwrap_or_default();
        let ids = elements.iter().filter_map(|e| e.get("id"));

        match self.id_scheme(section) {
            Numeric => {
                let max = ids.filter_map(Value::as_u64).max().unwrap_or(0);
                Value::from(max + 1)
            }
            Prefixed(prefix) => Value::String(next_sequential_id(
                ids.filter_map(Value::as_str),
                prefix,
            )),
        }
    }
}

fn as_element(item: &Value) -> Option<Element> {
    item.as_object().cloned()
}

/// Tag a copy of `element` with its toolkit sub-array, mirroring rebuild.
pub fn tag_section(element: &mut Element, section: Option<&str>) {
    if let Some(name) = section {
        element.insert(
            TOOLKIT_TYPE_FIELD.to_string(),
            Value::String(name.to_string()),
        );
    }
}

/// Next `<prefix>NNN` id after the highest numeric suffix already in use.
pub fn next_sequential_id<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    prefix: &str,
) -> String {
    let max = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix)?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{:03}", max + 1)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn spec(document_type: &str) -> &'static CollectionSpec {
        lookup(document_type).unwrap()
    }

    #[test]
    fn registry_types_are_unique() {
        let mut types: Vec<_> =
            COLLECTIONS.iter().map(|c| c.document_type).collect();
        types.sort();
        types.dedup();
        assert_eq!(types.len(), COLLECTIONS.len());
    }

    #[test]
    fn unknown_type_is_not_found() {
        assert!(matches!(
            lookup("spaceships"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn bare_array_blob() {
        let blob = json!([{"id": "m1"}, {"id": "m2"}, "stray"]);
        let elements = spec("models").elements(&blob).unwrap();
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn mapping_blob_uses_own_key() {
        let blob = json!({"agreements": [{"id": "agreement-001"}]});
        let elements = spec("dataAgreements").elements(&blob).unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn mapping_blob_falls_back_to_recognized_keys() {
        let blob = json!({"items": [{"id": "ref-001"}, {"id": "ref-002"}]});
        let elements = spec("models").elements(&blob).unwrap();
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn unrecognized_mapping_is_invalid_shape() {
        let blob = json!({"rows": [{"id": "x"}]});
        let err = spec("models").elements(&blob).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { .. }));
    }

    #[test]
    fn scalar_blob_is_invalid_shape() {
        let err = spec("models").elements(&json!(42)).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { .. }));
    }

    #[test]
    fn toolkit_sections_are_flattened_and_tagged() {
        let blob = json!({
            "toolkit": {
                "functions": [{"id": "fn_001", "name": "clean"}],
                "containers": [{"id": "cont_001"}, {"id": "cont_002"}],
                "infrastructure": [{"id": "infra_001"}],
                "unknown": [{"id": "zzz"}]
            }
        });
        let elements = spec("toolkit").elements(&blob).unwrap();
        assert_eq!(elements.len(), 4);
        assert_eq!(elements[0][TOOLKIT_TYPE_FIELD], json!("functions"));
        assert_eq!(elements[1][TOOLKIT_TYPE_FIELD], json!("containers"));
        assert_eq!(elements[3][TOOLKIT_TYPE_FIELD], json!("infrastructure"));
    }

    #[test]
    fn toolkit_without_sections_is_invalid_shape() {
        let err = spec("toolkit").elements(&json!([{"id": "x"}])).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { .. }));
    }

    #[test]
    fn locate_flat_and_sectioned() {
        let blob = json!({"models": [{"id": "m1"}, {"shortName": "CUST"}]});
        let loc = spec("models").locate(&blob, "CUST").unwrap();
        assert_eq!(loc, Location { section: None, index: 1 });
        assert!(spec("models").locate(&blob, "nope").is_none());

        let blob = json!({"toolkit": {"containers": [{"id": "cont_001"}]}});
        let loc = spec("toolkit").locate(&blob, "cont_001").unwrap();
        assert_eq!(
            loc,
            Location {
                section: Some("containers"),
                index: 0
            }
        );
    }

    #[test]
    fn locate_picks_last_duplicate() {
        let blob = json!([{"id": "m1", "name": "a"}, {"id": "m1", "name": "b"}]);
        let loc = spec("models").locate(&blob, "m1").unwrap();
        assert_eq!(loc, Location { section: None, index: 1 });

        let blob = json!({"toolkit": {
            "functions": [{"id": "x"}],
            "terraform": [{"id": "x"}]
        }});
        let loc = spec("toolkit").locate(&blob, "x").unwrap();
        assert_eq!(loc.section, Some("terraform"));
    }

    #[test]
    fn array_mut_creates_missing_containers() {
        let toolkit = spec("toolkit");
        let mut blob = toolkit.empty_blob();
        toolkit
            .array_mut(&mut blob, Some("terraform"))
            .unwrap()
            .push(json!({"id": "tf_001"}));
        assert_eq!(blob, json!({"toolkit": {"terraform": [{"id": "tf_001"}]}}));

        let models = spec("models");
        let mut blob = json!({});
        models
            .array_mut(&mut blob, None)
            .unwrap()
            .push(json!({"id": "m1"}));
        assert_eq!(blob, json!({"models": [{"id": "m1"}]}));
    }

    #[test]
    fn array_mut_rejects_unknown_section() {
        let toolkit = spec("toolkit");
        let mut blob = toolkit.empty_blob();
        assert!(matches!(
            toolkit.array_mut(&mut blob, Some("lambdas")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn section_for_defaults_to_functions() {
        let toolkit = spec("toolkit");
        let element = Element::new();
        assert_eq!(toolkit.section_for(&element).unwrap(), Some("functions"));

        let mut element = Element::new();
        element.insert("type".into(), json!("containers"));
        assert_eq!(toolkit.section_for(&element).unwrap(), Some("containers"));

        assert_eq!(spec("models").section_for(&element).unwrap(), None);
    }

    #[test]
    fn sequential_ids() {
        let ids = ["agreement-001", "agreement-007", "other-100", "agreement-x"];
        assert_eq!(
            next_sequential_id(ids.iter().copied(), "agreement-"),
            "agreement-008"
        );
        assert_eq!(next_sequential_id([], "ref-"), "ref-001");
    }

    #[test]
    fn id_scheme_per_section() {
        assert_eq!(
            spec("toolkit").id_scheme(Some("containers")),
            IdScheme::Prefixed("cont_")
        );
        assert_eq!(spec("reference").id_scheme(None), IdScheme::Prefixed("ref-"));
        assert_eq!(spec("applications").id_scheme(None), IdScheme::Numeric);
    }

    #[test]
    fn next_id_numeric_and_prefixed() {
        let blob = json!({"models": [{"id": 3}, {"id": 11}, {"id": "x"}]});
        assert_eq!(spec("models").next_id(&blob, None), json!(12));
        assert_eq!(spec("models").next_id(&json!([]), None), json!(1));

        let blob = json!({"items": [{"id": "ref-004"}]});
        assert_eq!(spec("reference").next_id(&blob, None), json!("ref-005"));

        let blob = json!({"toolkit": {
            "functions": [{"id": "fn_002"}],
            "containers": [{"id": "cont_009"}]
        }});
        assert_eq!(
            spec("toolkit").next_id(&blob, Some("containers")),
            json!("cont_010")
        );
    }
}

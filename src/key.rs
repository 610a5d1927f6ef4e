use std::fmt;

/// Composite index key: `document_type:document_id`.
///
/// At most one index entry exists per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentKey {
    pub document_type: String,
    pub document_id: String,
}

impl DocumentKey {
    pub fn new(document_type: &str, document_id: &str) -> Self {
        Self {
            document_type: document_type.to_string(),
            document_id: document_id.to_string(),
        }
    }

    /// Split a `type:id` string at the first colon.
    ///
    /// Ids may themselves contain colons; types never do.
    pub fn parse(s: &str) -> Option<Self> {
        let (document_type, document_id) = s.split_once(':')?;
        if document_type.is_empty() || document_id.is_empty() {
            return None;
        }
        Some(Self::new(document_type, document_id))
    }

    /// The flat string form used as the map key.
    pub fn encoded(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document_type, self.document_id)
    }
}

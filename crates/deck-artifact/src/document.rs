//! Structured documents produced by the external analysis step
//!
//! Both document types are parsed leniently. The analysis engine is an opaque
//! collaborator whose output drifts between versions, so a malformed field
//! degrades to a default instead of rejecting the whole document. Only a
//! payload that is not JSON at all is an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved analysis category mirroring the overview artifact
pub const OVERVIEW_CATEGORY: &str = "Overview";

/// Wrapper key used by servers that store the raw flat item list
pub const DETAILED_ANALYSIS_KEY: &str = "DetailedAnalysis";

/// Category assigned to flat items that carry none
pub const UNCATEGORIZED: &str = "Uncategorized";

const NOT_MENTIONED: &str = "Not mentioned";

/// Errors decoding a document payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// Payload is not valid JSON
    #[error("invalid json: {0}")]
    InvalidJson(String),
}

/// One scored criterion within a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisItem {
    /// Question being scored
    #[serde(rename = "Criteria", default)]
    pub criteria: String,
    /// Integer score; missing or non-numeric scores read as 0
    #[serde(rename = "Score", default)]
    pub score: i64,
    /// Free-text justification
    #[serde(rename = "Explanation", default)]
    pub explanation: String,
    /// Category tag, only present on flat item lists
    #[serde(rename = "Category", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl AnalysisItem {
    /// Create a categorized item
    #[must_use]
    pub fn new(criteria: impl Into<String>, score: i64, explanation: impl Into<String>) -> Self {
        Self {
            criteria: criteria.into(),
            score,
            explanation: explanation.into(),
            category: None,
        }
    }

    /// Read an item from arbitrary JSON without failing
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            criteria: text_field(value, "Criteria").unwrap_or_default(),
            score: Self::score_of(value),
            explanation: text_field(value, "Explanation").unwrap_or_default(),
            category: text_field(value, "Category"),
        }
    }

    /// `Score` field of a raw item, or 0 when missing or non-numeric
    #[must_use]
    pub fn score_of(value: &Value) -> i64 {
        match value.get("Score") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }
}

/// Category → ordered list of scored items
///
/// Kept as the raw JSON map so that unknown categories and unexpected shapes
/// survive a read/write cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisDocument(Map<String, Value>);

impl AnalysisDocument {
    /// Empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any JSON value
    ///
    /// A bare top-level array is treated as a flat item list and stored under
    /// [`DETAILED_ANALYSIS_KEY`]; other non-object values yield an empty
    /// document.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            list @ Value::Array(_) => {
                let mut map = Map::new();
                map.insert(DETAILED_ANALYSIS_KEY.to_string(), list);
                Self(map)
            }
            _ => Self::default(),
        }
    }

    /// Decode a stored payload
    ///
    /// # Errors
    /// Returns [`DocumentError::InvalidJson`] if the bytes are not JSON
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        serde_json::from_slice::<Value>(bytes)
            .map(Self::from_value)
            .map_err(|e| DocumentError::InvalidJson(e.to_string()))
    }

    /// Encode for storage
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.0).unwrap_or_default()
    }

    /// Append an item to a category, creating it if needed
    #[must_use]
    pub fn with_item(mut self, category: &str, item: AnalysisItem) -> Self {
        let entry = self
            .0
            .entry(category.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let (Value::Array(items), Ok(value)) = (entry, serde_json::to_value(&item)) {
            items.push(value);
        }
        self
    }

    /// Set a raw category value (any JSON shape)
    #[must_use]
    pub fn with_raw(mut self, category: &str, value: Value) -> Self {
        self.0.insert(category.to_string(), value);
        self
    }

    /// Mirror an overview into the reserved category
    #[must_use]
    pub fn with_overview(mut self, overview: &OverviewDocument) -> Self {
        if let Ok(value) = serde_json::to_value(overview) {
            self.0.insert(OVERVIEW_CATEGORY.to_string(), value);
        }
        self
    }

    /// Raw top-level entries, the reserved overview category excluded
    pub fn scored_categories(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != OVERVIEW_CATEGORY)
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Overview mirrored into the document, if any
    #[must_use]
    pub fn overview(&self) -> Option<OverviewDocument> {
        self.0.get(OVERVIEW_CATEGORY).map(OverviewDocument::from_value)
    }

    /// Items grouped by category
    ///
    /// Flat lists stored under [`DETAILED_ANALYSIS_KEY`] are regrouped by each
    /// item's own `Category`. Categories holding anything but a list are
    /// skipped. Order within a category follows the stored order.
    #[must_use]
    pub fn categorized(&self) -> Vec<(String, Vec<AnalysisItem>)> {
        let mut groups: Vec<(String, Vec<AnalysisItem>)> = Vec::new();
        let mut push = |category: &str, item: AnalysisItem| {
            match groups.iter_mut().find(|(name, _)| name == category) {
                Some((_, items)) => items.push(item),
                None => groups.push((category.to_string(), vec![item])),
            }
        };

        for (category, value) in self.scored_categories() {
            let Value::Array(raw_items) = value else {
                continue;
            };
            for raw in raw_items {
                let mut item = AnalysisItem::from_value(raw);
                if category == DETAILED_ANALYSIS_KEY {
                    let target = item.category.take().unwrap_or_else(|| UNCATEGORIZED.to_string());
                    push(&target, item);
                } else {
                    push(category, item);
                }
            }
        }
        groups
    }

    /// Number of top-level entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying JSON map
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Flat summary of a deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewDocument {
    /// Startup location
    #[serde(rename = "Geography")]
    pub geography: String,
    /// Industry
    #[serde(rename = "Industry")]
    pub industry: String,
    /// Funding stage
    #[serde(rename = "Stage")]
    pub stage: String,
    /// Analyst's overall score (out of 10)
    #[serde(rename = "OverallScore")]
    pub overall_score: i64,
}

impl Default for OverviewDocument {
    fn default() -> Self {
        Self {
            geography: NOT_MENTIONED.to_string(),
            industry: NOT_MENTIONED.to_string(),
            stage: NOT_MENTIONED.to_string(),
            overall_score: 0,
        }
    }
}

impl OverviewDocument {
    /// Placeholder used when no overview could be read
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether every field still holds its placeholder
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Read an overview from any of the shapes servers have produced
    ///
    /// Accepts the flat object, an object wrapped under `Overview`, or the
    /// wrapper holding the model's raw JSON text.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value.get(OVERVIEW_CATEGORY) {
            Some(Value::String(text)) => serde_json::from_str::<Value>(text)
                .map(|inner| Self::from_fields(&inner))
                .unwrap_or_default(),
            Some(inner @ Value::Object(_)) => Self::from_fields(inner),
            _ => Self::from_fields(value),
        }
    }

    /// Decode a stored payload
    ///
    /// # Errors
    /// Returns [`DocumentError::InvalidJson`] if the bytes are not JSON
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        serde_json::from_slice::<Value>(bytes)
            .map(|value| Self::from_value(&value))
            .map_err(|e| DocumentError::InvalidJson(e.to_string()))
    }

    /// Encode for storage
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    fn from_fields(value: &Value) -> Self {
        let defaults = Self::default();
        Self {
            geography: text_field(value, "Geography").unwrap_or(defaults.geography),
            industry: text_field(value, "Industry").unwrap_or(defaults.industry),
            stage: text_field(value, "Stage").unwrap_or(defaults.stage),
            overall_score: match value.get("OverallScore") {
                Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
                Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
                _ => 0,
            },
        }
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

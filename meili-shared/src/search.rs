//! Search request and response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;

/// A filter expression, either a single expression or nested arrays of them.
///
/// Inner arrays are combined with `OR`, outer elements with `AND`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Expression(String),
    Nested(Vec<Filter>),
}

impl From<&str> for Filter {
    fn from(expression: &str) -> Self {
        Self::Expression(expression.to_string())
    }
}

impl From<String> for Filter {
    fn from(expression: String) -> Self {
        Self::Expression(expression)
    }
}

/// How query terms must match documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingStrategy {
    #[default]
    Last,
    All,
    Frequency,
}

/// Parameters of a search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    pub offset: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<String>>,
    pub attributes_to_retrieve: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_highlight: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub matching_strategy: MatchingStrategy,
    pub show_ranking_score: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_score_threshold: Option<f64>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            q: None,
            offset: 0,
            limit: 20,
            filter: None,
            facets: None,
            attributes_to_retrieve: vec!["*".to_string()],
            attributes_to_highlight: None,
            sort: None,
            hits_per_page: None,
            page: None,
            matching_strategy: MatchingStrategy::default(),
            show_ranking_score: false,
            ranking_score_threshold: None,
        }
    }
}

impl SearchQuery {
    /// Create a query for the given text.
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set pagination by offset and limit.
    pub fn with_offset_limit(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Set the sort criteria.
    pub fn with_sort(mut self, sort: Vec<String>) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Request a facet distribution for the given attributes.
    pub fn with_facets(mut self, facets: Vec<String>) -> Self {
        self.facets = Some(facets);
        self
    }
}

/// Response of a search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub hits: Vec<Document>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub estimated_total_hits: Option<usize>,
    #[serde(default)]
    pub hits_per_page: Option<usize>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub total_pages: Option<usize>,
    #[serde(default)]
    pub total_hits: Option<usize>,
    pub processing_time_ms: u64,
    pub query: String,
    #[serde(default)]
    pub facet_distribution: Option<Value>,
}

/// Parameters of a facet search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSearchQuery {
    pub facet_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    pub matching_strategy: MatchingStrategy,
}

impl FacetSearchQuery {
    /// Create a facet search over `facet_name`.
    pub fn new(facet_name: impl Into<String>) -> Self {
        Self {
            facet_name: facet_name.into(),
            facet_query: None,
            q: None,
            filter: None,
            matching_strategy: MatchingStrategy::default(),
        }
    }

    /// Restrict facet values to those matching `facet_query`.
    pub fn with_facet_query(mut self, facet_query: impl Into<String>) -> Self {
        self.facet_query = Some(facet_query.into());
        self
    }
}

/// A facet value and the number of matching documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetHit {
    pub value: String,
    pub count: u64,
}

/// Response of a facet search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSearchResults {
    pub facet_hits: Vec<FacetHit>,
    #[serde(default)]
    pub facet_query: Option<String>,
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_query_serializes_camel_case_and_skips_unset() {
        let query = SearchQuery::new("carol").with_filter("genre = drama");
        let value = serde_json::to_value(&query).unwrap();

        assert_eq!(value["q"], json!("carol"));
        assert_eq!(value["filter"], json!("genre = drama"));
        assert_eq!(value["attributesToRetrieve"], json!(["*"]));
        assert_eq!(value["matchingStrategy"], json!("last"));
        assert!(value.get("sort").is_none());
        assert!(value.get("hitsPerPage").is_none());
    }

    #[test]
    fn test_nested_filter_serialization() {
        let filter = Filter::Nested(vec![
            Filter::Nested(vec!["genre = horror".into(), "genre = comedy".into()]),
            "release_date > 795484800".into(),
        ]);

        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!([["genre = horror", "genre = comedy"], "release_date > 795484800"])
        );
    }

    #[test]
    fn test_search_results_deserialize() {
        let results: SearchResults = serde_json::from_value(json!({
            "hits": [{"id": 1, "title": "Carol"}],
            "offset": 0,
            "limit": 20,
            "estimatedTotalHits": 1,
            "processingTimeMs": 2,
            "query": "carol"
        }))
        .unwrap();

        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.estimated_total_hits, Some(1));
        assert!(results.facet_distribution.is_none());
    }
}

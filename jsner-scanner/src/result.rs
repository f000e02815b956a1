use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Bucket a candidate is filed under at discovery time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Endpoint,
    Graphql,
    Api,
    Config,
    Other,
}

impl Category {
    /// Bucket order used by every export
    pub const EXPORT_ORDER: [Category; 5] = [
        Category::Endpoint,
        Category::Graphql,
        Category::Api,
        Category::Config,
        Category::Other,
    ];

    /// Buckets that give a CSV row its type; `other` never does
    pub const LABEL_PRECEDENCE: [Category; 4] = [
        Category::Endpoint,
        Category::Graphql,
        Category::Api,
        Category::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Endpoint => "endpoint",
            Category::Graphql => "graphql",
            Category::Api => "api",
            Category::Config => "config",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered, duplicate-free sequence of candidate strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedSet(IndexSet<String>);

impl OrderedSet {
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    /// Returns false when the value was already present; the first position wins.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.0.insert(value.into())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn retain(&mut self, keep: impl FnMut(&String) -> bool) {
        self.0.retain(keep);
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a OrderedSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Methods the verifier walks through, in probe order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status recorded for one probe: a numeric code, `"no-cors"` for opaque
/// responses, or `"error"` when no response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Code(u16),
    NoCors,
    Error,
}

impl Serialize for ProbeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProbeStatus::Code(code) => serializer.serialize_u16(*code),
            ProbeStatus::NoCors => serializer.serialize_str("no-cors"),
            ProbeStatus::Error => serializer.serialize_str("error"),
        }
    }
}

impl<'de> Deserialize<'de> for ProbeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(ProbeStatus::Code(code)),
            Raw::Label(label) if label == "no-cors" => Ok(ProbeStatus::NoCors),
            Raw::Label(label) if label == "error" => Ok(ProbeStatus::Error),
            Raw::Label(other) => Err(serde::de::Error::custom(format!(
                "unknown probe status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Code(code) => write!(f, "{}", code),
            ProbeStatus::NoCors => f.write_str("no-cors"),
            ProbeStatus::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: ProbeStatus,
    pub accessible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VerificationOutcome {
    pub fn reachable(status: ProbeStatus) -> Self {
        Self {
            status,
            accessible: true,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            status: ProbeStatus::Error,
            accessible: false,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

pub type MethodOutcomes = IndexMap<HttpMethod, VerificationOutcome>;
pub type VerificationMap = IndexMap<String, MethodOutcomes>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationBadge {
    Verified,
    Failed,
    Unverified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultStats {
    pub total: usize,
    pub apis: usize,
    pub graphql: usize,
    pub config: usize,
}

/// Categorized candidates for one scanned page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub endpoints: OrderedSet,
    pub graphql: OrderedSet,
    pub apis: OrderedSet,
    pub config: OrderedSet,
    pub other: OrderedSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationMap>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, category: Category) -> &OrderedSet {
        match category {
            Category::Endpoint => &self.endpoints,
            Category::Graphql => &self.graphql,
            Category::Api => &self.apis,
            Category::Config => &self.config,
            Category::Other => &self.other,
        }
    }

    pub fn bucket_mut(&mut self, category: Category) -> &mut OrderedSet {
        match category {
            Category::Endpoint => &mut self.endpoints,
            Category::Graphql => &mut self.graphql,
            Category::Api => &mut self.apis,
            Category::Config => &mut self.config,
            Category::Other => &mut self.other,
        }
    }

    pub fn insert(&mut self, category: Category, value: impl Into<String>) -> bool {
        self.bucket_mut(category).insert(value)
    }

    /// Number of entries over all buckets, cross-bucket duplicates included
    pub fn total(&self) -> usize {
        Category::EXPORT_ORDER
            .iter()
            .map(|c| self.bucket(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Every entry of every bucket, in export order
    pub fn all_candidates(&self) -> impl Iterator<Item = (Category, &String)> {
        Category::EXPORT_ORDER
            .into_iter()
            .flat_map(move |c| self.bucket(c).iter().map(move |v| (c, v)))
    }

    /// First bucket holding `value`, tested as endpoint, graphql, api, then config.
    /// Values held only by `other` have no category.
    pub fn category_of(&self, value: &str) -> Option<Category> {
        Category::LABEL_PRECEDENCE
            .into_iter()
            .find(|c| self.bucket(*c).contains(value))
    }

    /// `/`-prefixed entries of the endpoint and api buckets, deduplicated
    pub fn verifiable_candidates(&self) -> Vec<String> {
        self.endpoints
            .iter()
            .chain(self.apis.iter())
            .filter(|c| c.starts_with('/'))
            .cloned()
            .collect::<OrderedSet>()
            .to_vec()
    }

    /// Merge outcomes into the stored map; a candidate's per-method entries are replaced.
    pub fn apply_verification(&mut self, map: VerificationMap) {
        let existing = self.verification.get_or_insert_with(IndexMap::new);
        for (candidate, outcomes) in map {
            existing.insert(candidate, outcomes);
        }
    }

    pub fn badge(&self, candidate: &str) -> VerificationBadge {
        match self
            .verification
            .as_ref()
            .and_then(|map| map.get(candidate))
        {
            Some(outcomes) if outcomes.values().any(|o| o.accessible) => {
                VerificationBadge::Verified
            }
            Some(_) => VerificationBadge::Failed,
            None => VerificationBadge::Unverified,
        }
    }

    pub fn stats(&self) -> ResultStats {
        ResultStats {
            total: self.total(),
            apis: self.apis.len(),
            graphql: self.graphql.len(),
            config: self.config.len(),
        }
    }

    /// Drop empty and single-character entries from every bucket
    pub fn prune_short(&mut self) {
        for category in Category::EXPORT_ORDER {
            self.bucket_mut(category)
                .retain(|value| value.chars().count() > 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_set_keeps_first_insertion() {
        let mut set = OrderedSet::new();
        assert!(set.insert("/b"));
        assert!(set.insert("/a"));
        assert!(!set.insert("/b"));
        assert_eq!(set.to_vec(), vec!["/b", "/a"]);
    }

    #[test]
    fn test_same_value_allowed_in_two_buckets() {
        let mut results = ResultSet::new();
        results.insert(Category::Endpoint, "/api/users");
        results.insert(Category::Api, "/api/users");
        assert_eq!(results.total(), 2);
        assert_eq!(results.category_of("/api/users"), Some(Category::Endpoint));
    }

    #[test]
    fn test_category_of_skips_other_bucket() {
        let mut results = ResultSet::new();
        results.insert(Category::Other, "soap/Service.asmx");
        results.insert(Category::Other, "config.xml");
        results.insert(Category::Config, "config.xml");
        assert_eq!(results.category_of("soap/Service.asmx"), None);
        assert_eq!(results.category_of("config.xml"), Some(Category::Config));
    }

    #[test]
    fn test_verifiable_candidates_only_slash_prefixed() {
        let mut results = ResultSet::new();
        results.insert(Category::Endpoint, "/login");
        results.insert(Category::Endpoint, "https://cdn.example.com/x.js");
        results.insert(Category::Endpoint, "?page=2");
        results.insert(Category::Api, "/login");
        results.insert(Category::Api, "/api/v2");
        assert_eq!(results.verifiable_candidates(), vec!["/login", "/api/v2"]);
    }

    #[test]
    fn test_badge_from_outcomes() {
        let mut results = ResultSet::new();
        let mut map = VerificationMap::new();
        let mut ok = MethodOutcomes::new();
        ok.insert(HttpMethod::Get, VerificationOutcome::reachable(ProbeStatus::NoCors));
        map.insert("/ok".to_string(), ok);
        let mut bad = MethodOutcomes::new();
        bad.insert(HttpMethod::Get, VerificationOutcome::failed("refused".into()));
        map.insert("/bad".to_string(), bad);
        results.apply_verification(map);

        assert_eq!(results.badge("/ok"), VerificationBadge::Verified);
        assert_eq!(results.badge("/bad"), VerificationBadge::Failed);
        assert_eq!(results.badge("/never"), VerificationBadge::Unverified);
    }

    #[test]
    fn test_json_key_order_and_status_encoding() {
        let mut results = ResultSet::new();
        results.insert(Category::Other, "soap");
        results.insert(Category::Endpoint, "/x");
        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(
            json,
            r#"{"endpoints":["/x"],"graphql":[],"apis":[],"config":[],"other":["soap"]}"#
        );

        assert_eq!(serde_json::to_string(&ProbeStatus::Code(404)).unwrap(), "404");
        assert_eq!(serde_json::to_string(&ProbeStatus::NoCors).unwrap(), "\"no-cors\"");
        let parsed: ProbeStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(parsed, ProbeStatus::Error);
    }

    #[test]
    fn test_prune_short_drops_single_characters() {
        let mut results = ResultSet::new();
        results.insert(Category::Endpoint, "/");
        results.insert(Category::Endpoint, "");
        results.insert(Category::Endpoint, "/a");
        results.prune_short();
        assert_eq!(results.endpoints.to_vec(), vec!["/a"]);
    }
}

// Pattern catalog: lexical rules that turn page text into endpoint candidates

use crate::result::{Category, OrderedSet, ResultSet};
use once_cell::sync::Lazy;
use regex::Regex;

/// Substrings that disqualify an endpoint candidate, matched case-insensitively
pub const EXCLUDED_SUBSTRINGS: &[&str] = &[
    "javascript:",
    "data:",
    "mailto:",
    ".png",
    ".jpg",
    ".jpeg",
    ".gif",
    ".svg",
    ".css",
    ".woff",
    ".woff2",
    ".ttf",
    ".eot",
    ".ico",
];

/// At least two characters and free of every excluded substring
pub fn is_valid_endpoint(candidate: &str) -> bool {
    if candidate.chars().count() < 2 {
        return false;
    }
    let lowered = candidate.to_lowercase();
    !EXCLUDED_SUBSTRINGS.iter().any(|exc| lowered.contains(exc))
}

static QUOTED_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"["'`](/[a-zA-Z0-9_?&=/\-#.]+)["'`]"##).unwrap());

static QUERY_STRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"["'`](\?[a-zA-Z0-9_&=/\-#.]+)["'`]"##).unwrap());

static FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"["'`](#[a-zA-Z0-9_&=/\-.]+)["'`]"##).unwrap());

static ABSOLUTE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"https?://[a-zA-Z0-9\-.]+\.[a-zA-Z]{2,}[a-zA-Z0-9\-._~:/?#\[\]@!$&'()*+,;=]*"##)
        .unwrap()
});

static API_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/(?:api|v[0-9]|graphql|rest|service|endpoint)[a-zA-Z0-9_?&=/\-]*").unwrap()
});

static GRAPHQL_OPERATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:query|mutation|subscription)\s+[a-zA-Z0-9_]+").unwrap());

static CONFIG_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:config|settings|env|\.json|\.xml)[a-zA-Z0-9_/\-.]*").unwrap()
});

static GRAPHQL_ENDPOINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["']?(?:/graphql|/gql|/query)[a-zA-Z0-9_?&=/\-]*["']?"#).unwrap()
});

static XML_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:soap|xml|service|asmx|wsdl)[a-zA-Z0-9_?&=/\-.]*").unwrap()
});

static ATTRIBUTE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:href|src|data-url|action|data-endpoint)=["']([^"']+)["']"#).unwrap()
});

static QUICK_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"(?:"|%27|`)([/?][a-zA-Z0-9_?&=/\-#.]*)(?:"|'|%60)"##).unwrap());

/// One catalog entry: a pattern, the bucket it feeds and its validity filter
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub category: Category,
    regex: &'static Lazy<Regex>,
    /// Capture group holding the candidate (0 = whole match)
    group: usize,
    /// Candidates need at least this many characters
    min_chars: usize,
    apply_exclusions: bool,
    strip_quotes: bool,
}

impl Rule {
    /// Every accepted candidate in `text`, leftmost-first and non-overlapping
    pub fn candidates<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        let group = self.group;
        let strip_quotes = self.strip_quotes;
        self.regex
            .captures_iter(text)
            .filter_map(move |caps| caps.get(group).map(|m| m.as_str()))
            .map(move |raw| {
                if strip_quotes {
                    raw.replace(['"', '\''], "")
                } else {
                    raw.to_string()
                }
            })
            .filter(move |candidate| self.accepts(candidate))
    }

    fn accepts(&self, candidate: &str) -> bool {
        if candidate.chars().count() < self.min_chars {
            return false;
        }
        !self.apply_exclusions || is_valid_endpoint(candidate)
    }

    /// Insert every accepted candidate into this rule's bucket
    pub fn apply(&self, text: &str, results: &mut ResultSet) {
        for candidate in self.candidates(text) {
            results.insert(self.category, candidate);
        }
    }
}

pub static QUOTED_PATH: Rule = Rule {
    name: "quoted-path",
    category: Category::Endpoint,
    regex: &QUOTED_PATH_RE,
    group: 1,
    min_chars: 2,
    apply_exclusions: true,
    strip_quotes: false,
};

pub static QUERY_STRING: Rule = Rule {
    name: "query-string",
    category: Category::Endpoint,
    regex: &QUERY_STRING_RE,
    group: 1,
    min_chars: 3,
    apply_exclusions: false,
    strip_quotes: false,
};

pub static FRAGMENT: Rule = Rule {
    name: "fragment",
    category: Category::Endpoint,
    regex: &FRAGMENT_RE,
    group: 1,
    min_chars: 3,
    apply_exclusions: false,
    strip_quotes: false,
};

pub static ABSOLUTE_URL: Rule = Rule {
    name: "absolute-url",
    category: Category::Endpoint,
    regex: &ABSOLUTE_URL_RE,
    group: 0,
    min_chars: 2,
    apply_exclusions: true,
    strip_quotes: false,
};

pub static API_HINT: Rule = Rule {
    name: "api-hint",
    category: Category::Api,
    regex: &API_HINT_RE,
    group: 0,
    min_chars: 1,
    apply_exclusions: false,
    strip_quotes: false,
};

pub static GRAPHQL_OPERATION: Rule = Rule {
    name: "graphql-operation",
    category: Category::Graphql,
    regex: &GRAPHQL_OPERATION_RE,
    group: 0,
    min_chars: 1,
    apply_exclusions: false,
    strip_quotes: false,
};

pub static CONFIG_HINT: Rule = Rule {
    name: "config-hint",
    category: Category::Config,
    regex: &CONFIG_HINT_RE,
    group: 0,
    min_chars: 5,
    apply_exclusions: false,
    strip_quotes: false,
};

pub static GRAPHQL_ENDPOINT: Rule = Rule {
    name: "graphql-endpoint",
    category: Category::Graphql,
    regex: &GRAPHQL_ENDPOINT_RE,
    group: 0,
    min_chars: 1,
    apply_exclusions: false,
    strip_quotes: true,
};

pub static XML_HINT: Rule = Rule {
    name: "xml-hint",
    category: Category::Other,
    regex: &XML_HINT_RE,
    group: 0,
    min_chars: 1,
    apply_exclusions: false,
    strip_quotes: false,
};

pub static ATTRIBUTE_URL: Rule = Rule {
    name: "attribute-url",
    category: Category::Endpoint,
    regex: &ATTRIBUTE_URL_RE,
    group: 1,
    min_chars: 2,
    apply_exclusions: true,
    strip_quotes: false,
};

/// Rules 1-7, run over script, style, JSON and markup text
pub static CONTENT_RULES: [&Rule; 7] = [
    &QUOTED_PATH,
    &QUERY_STRING,
    &FRAGMENT,
    &ABSOLUTE_URL,
    &API_HINT,
    &GRAPHQL_OPERATION,
    &CONFIG_HINT,
];

/// Run the content rules over `text`, in catalog order
pub fn scan_content(text: &str, results: &mut ResultSet) {
    if text.is_empty() {
        return;
    }
    for rule in CONTENT_RULES.iter() {
        rule.apply(text, results);
    }
}

/// Single combined pattern used by the quick scan; everything lands in one set.
///
/// The closing delimiter is left unconsumed, so a `"` that ends one path can open the next.
pub fn scan_quick(text: &str, found: &mut OrderedSet) {
    let mut start = 0;
    while let Some(caps) = QUICK_PATH_RE.captures_at(text, start) {
        let Some(m) = caps.get(1) else {
            break;
        };
        found.insert(m.as_str());
        start = m.end();
    }
}

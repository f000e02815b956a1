use crate::patterns::{ATTRIBUTE_URL, GRAPHQL_ENDPOINT, XML_HINT, scan_content};
use crate::result::{Category, ResultSet};
use crate::sources::PageSources;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which source categories a scan visits. A disabled category is skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    #[serde(rename = "scanJS", default)]
    pub scan_js: bool,
    #[serde(rename = "scanCSS", default)]
    pub scan_css: bool,
    #[serde(rename = "scanJSON", default)]
    pub scan_json: bool,
    #[serde(rename = "scanHTML", default)]
    pub scan_html: bool,
    #[serde(rename = "scanGraphQL", default)]
    pub scan_graphql: bool,
    #[serde(rename = "scanXML", default)]
    pub scan_xml: bool,
}

impl ScanOptions {
    /// Every source category disabled
    pub fn none() -> Self {
        Self {
            scan_js: false,
            scan_css: false,
            scan_json: false,
            scan_html: false,
            scan_graphql: false,
            scan_xml: false,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            scan_js: true,
            scan_css: true,
            scan_json: true,
            scan_html: true,
            scan_graphql: true,
            scan_xml: true,
        }
    }
}

/// Apply the pattern catalog to every enabled source and bucket the matches.
///
/// Sources are visited in a fixed order (scripts, styles, JSON blocks, markup,
/// GraphQL endpoints, XML hints), so identical input always yields an identical
/// result set, insertion order included.
pub fn extract(sources: &PageSources, options: &ScanOptions) -> ResultSet {
    let mut results = ResultSet::new();

    if options.scan_js {
        for script in &sources.scripts {
            scan_content(&script.text, &mut results);
            if let Some(ref src) = script.src {
                results.insert(Category::Endpoint, src.as_str());
            }
            if let Some(ref body) = script.body {
                scan_content(body, &mut results);
            }
        }
    }

    if options.scan_css {
        for style in &sources.styles {
            scan_content(style, &mut results);
        }
        for href in &sources.stylesheet_links {
            results.insert(Category::Endpoint, href.as_str());
        }
    }

    if options.scan_json {
        for block in &sources.json_blocks {
            scan_content(block, &mut results);
        }
    }

    if options.scan_html {
        scan_content(&sources.markup, &mut results);
        ATTRIBUTE_URL.apply(&sources.markup, &mut results);
    }

    if options.scan_graphql {
        GRAPHQL_ENDPOINT.apply(&sources.markup, &mut results);
    }

    if options.scan_xml {
        XML_HINT.apply(&sources.markup, &mut results);
    }

    results.prune_short();

    debug!(
        "Extracted {} endpoints, {} apis, {} graphql, {} config, {} other",
        results.endpoints.len(),
        results.apis.len(),
        results.graphql.len(),
        results.config.len(),
        results.other.len()
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::EXCLUDED_SUBSTRINGS;
    use crate::sources::ScriptSource;
    use std::collections::HashSet;

    fn markup_only(markup: &str) -> PageSources {
        PageSources::from_html(markup, None)
    }

    #[test]
    fn test_script_src_and_inline_fetch() {
        let html = r#"<html><head><script src="/static/app.js"></script></head>
            <body><script>fetch("/api/v1/users")</script></body></html>"#;
        let options = ScanOptions {
            scan_js: true,
            scan_html: true,
            ..ScanOptions::none()
        };

        let results = extract(&markup_only(html), &options);

        assert!(results.endpoints.contains("/static/app.js"));
        assert!(results.endpoints.contains("/api/v1/users"));
        assert!(results.apis.contains("/api/v1/users"));
    }

    #[test]
    fn test_graphql_operation_from_script() {
        let html = "<script>const op = `mutation CreateUser { createUser { id } }`;</script>";
        let options = ScanOptions {
            scan_js: true,
            ..ScanOptions::none()
        };

        let results = extract(&markup_only(html), &options);
        assert!(results.graphql.contains("mutation CreateUser"));
    }

    #[test]
    fn test_disabled_js_yields_nothing_from_scripts() {
        let html = r#"<script src="/bundle.js"></script><script>fetch("/api/secret")</script>"#;
        let mut sources = markup_only(html);
        sources.scripts[0].body = Some(r#"axios.get("/api/from-body")"#.to_string());

        let results = extract(&sources, &ScanOptions::none());
        assert!(results.is_empty());

        let css_only = ScanOptions {
            scan_css: true,
            scan_json: true,
            ..ScanOptions::none()
        };
        let results = extract(&sources, &css_only);
        assert!(results.is_empty());
    }

    #[test]
    fn test_external_body_scanned_when_fetched() {
        let sources = PageSources {
            scripts: vec![ScriptSource {
                src: Some("https://example.com/app.js".to_string()),
                text: String::new(),
                body: Some(r#"const u = "/rest/orders";"#.to_string()),
            }],
            ..Default::default()
        };
        let options = ScanOptions {
            scan_js: true,
            ..ScanOptions::none()
        };

        let results = extract(&sources, &options);
        assert_eq!(
            results.endpoints.to_vec(),
            vec!["https://example.com/app.js", "/rest/orders"]
        );
        assert_eq!(results.apis.to_vec(), vec!["/rest/orders"]);
    }

    #[test]
    fn test_unfetched_script_still_records_src() {
        let sources = PageSources {
            scripts: vec![ScriptSource {
                src: Some("https://cdn.example.net/lib.js".to_string()),
                text: String::new(),
                body: None,
            }],
            ..Default::default()
        };
        let options = ScanOptions {
            scan_js: true,
            ..ScanOptions::none()
        };
        let results = extract(&sources, &options);
        assert_eq!(results.endpoints.to_vec(), vec!["https://cdn.example.net/lib.js"]);
    }

    #[test]
    fn test_css_and_json_sources() {
        let html = r#"<link rel="stylesheet" href="/theme.css">
            <style>@import "/fonts/remote";</style>
            <script type="application/json">{"next": "/api/next-page"}</script>"#;
        let options = ScanOptions {
            scan_css: true,
            scan_json: true,
            ..ScanOptions::none()
        };

        let results = extract(&markup_only(html), &options);
        // stylesheet hrefs are recorded directly, bypassing the exclusion filter
        assert!(results.endpoints.contains("/theme.css"));
        assert!(results.endpoints.contains("/fonts/remote"));
        assert!(results.endpoints.contains("/api/next-page"));
    }

    #[test]
    fn test_markup_only_passes() {
        let html = r#"<form action="/soap/OrderService.asmx"></form>
            <div data-gql='/graphql'></div>"#;

        let graphql = extract(
            &markup_only(html),
            &ScanOptions {
                scan_graphql: true,
                ..ScanOptions::none()
            },
        );
        assert_eq!(graphql.graphql.to_vec(), vec!["/graphql"]);
        assert!(graphql.endpoints.is_empty());

        let xml = extract(
            &markup_only(html),
            &ScanOptions {
                scan_xml: true,
                ..ScanOptions::none()
            },
        );
        assert_eq!(xml.other.to_vec(), vec!["soap/OrderService.asmx"]);
    }

    #[test]
    fn test_attribute_values_with_html_pass() {
        let html = r#"<a href="https://example.com/docs">d</a><a href="mailto:a@b.c">m</a>"#;
        let results = extract(
            &markup_only(html),
            &ScanOptions {
                scan_html: true,
                ..ScanOptions::none()
            },
        );
        assert!(results.endpoints.contains("https://example.com/docs"));
        assert!(!results.endpoints.iter().any(|e| e.starts_with("mailto:")));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = r##"<script>
            fetch("/api/a"); fetch('/api/b?x=1'); var h = "#/route";
            const q = `query ListUsers { users { id } }`;
            load("config/app.json"); go("https://api.example.com/v1/x");
        </script><a href="/about">a</a>"##;
        let sources = markup_only(html);
        let options = ScanOptions::default();

        let first = extract(&sources, &options);
        let second = extract(&sources, &options);
        assert_eq!(first, second);
        assert_eq!(
            first.endpoints.to_vec().first().map(String::as_str),
            Some("/api/a")
        );
    }

    #[test]
    fn test_no_duplicates_and_no_excluded_endpoints() {
        let html = r#"<script>
            a("/api/users"); b("/api/users"); c('/logo.PNG'); d("/x");
            e("https://example.com/font.woff"); f(`/data:thing`);
        </script>"#;
        let results = extract(&markup_only(html), &ScanOptions::default());

        for category in Category::EXPORT_ORDER {
            let values = results.bucket(category).to_vec();
            let unique: HashSet<&String> = values.iter().collect();
            assert_eq!(unique.len(), values.len());
            assert!(values.iter().all(|v| v.chars().count() >= 2));
        }
        for endpoint in results.endpoints.iter() {
            let lowered = endpoint.to_lowercase();
            assert!(
                !EXCLUDED_SUBSTRINGS.iter().any(|exc| lowered.contains(exc)),
                "excluded substring leaked into {}",
                endpoint
            );
        }
        assert_eq!(
            results.endpoints.iter().filter(|e| *e == "/api/users").count(),
            1
        );
    }
}

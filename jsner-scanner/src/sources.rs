use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// One `<script>` element, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptSource {
    /// Resolved `src` attribute for external scripts
    pub src: Option<String>,
    /// Inline text content
    pub text: String,
    /// Body of the external script once fetched; `None` when not fetched or unavailable
    pub body: Option<String>,
}

/// Text blobs of one page, grouped by where they came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSources {
    pub page_url: Option<Url>,
    /// Full document markup
    pub markup: String,
    /// Script elements, JSON data blocks excluded
    pub scripts: Vec<ScriptSource>,
    /// Inline `<style>` text
    pub styles: Vec<String>,
    /// Resolved hrefs of `<link rel="stylesheet">`
    pub stylesheet_links: Vec<String>,
    /// Bodies of `<script type="application/json">`
    pub json_blocks: Vec<String>,
}

impl PageSources {
    /// Locate scripts, styles, stylesheet links and JSON blocks in `html`.
    /// Relative references are resolved against `page_url` when one is given.
    pub fn from_html(html: &str, page_url: Option<&Url>) -> Self {
        let document = Html::parse_document(html);

        let script_selector = Selector::parse("script").unwrap();
        let style_selector = Selector::parse("style").unwrap();
        let link_selector = Selector::parse("link[href]").unwrap();

        let mut sources = PageSources {
            page_url: page_url.cloned(),
            markup: html.to_string(),
            ..Default::default()
        };

        for element in document.select(&script_selector) {
            let text: String = element.text().collect();
            let is_json = element
                .value()
                .attr("type")
                .map(|t| t.trim().eq_ignore_ascii_case("application/json"))
                .unwrap_or(false);

            if is_json {
                sources.json_blocks.push(text);
                continue;
            }

            let src = element
                .value()
                .attr("src")
                .filter(|s| !s.trim().is_empty())
                .map(|s| resolve_reference(page_url, s.trim()));

            sources.scripts.push(ScriptSource {
                src,
                text,
                body: None,
            });
        }

        for element in document.select(&style_selector) {
            sources.styles.push(element.text().collect());
        }

        for element in document.select(&link_selector) {
            let is_stylesheet = element
                .value()
                .attr("rel")
                .map(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                })
                .unwrap_or(false);

            if is_stylesheet
                && let Some(href) = element.value().attr("href")
                && !href.trim().is_empty()
            {
                sources
                    .stylesheet_links
                    .push(resolve_reference(page_url, href.trim()));
            }
        }

        debug!(
            "Located {} scripts, {} styles, {} stylesheets, {} JSON blocks",
            sources.scripts.len(),
            sources.styles.len(),
            sources.stylesheet_links.len(),
            sources.json_blocks.len()
        );

        sources
    }

    /// External script URLs, in document order
    pub fn external_script_urls(&self) -> Vec<String> {
        self.scripts.iter().filter_map(|s| s.src.clone()).collect()
    }
}

/// Resolve `reference` against the page URL; left untouched without a base or when joining fails.
pub fn resolve_reference(page_url: Option<&Url>, reference: &str) -> String {
    page_url
        .and_then(|base| base.join(reference).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| reference.to_string())
}

use jsner_scanner::result::{Category, ResultSet};

/// Display order of the results view
pub const DISPLAY_ORDER: [Category; 5] = [
    Category::Endpoint,
    Category::Api,
    Category::Graphql,
    Category::Config,
    Category::Other,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Endpoints,
    Apis,
    Graphql,
    Config,
    Other,
}

impl CategoryFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(CategoryFilter::All),
            "endpoints" | "endpoint" => Some(CategoryFilter::Endpoints),
            "apis" | "api" => Some(CategoryFilter::Apis),
            "graphql" => Some(CategoryFilter::Graphql),
            "config" => Some(CategoryFilter::Config),
            "other" => Some(CategoryFilter::Other),
            _ => None,
        }
    }

    pub fn includes(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Endpoints => category == Category::Endpoint,
            CategoryFilter::Apis => category == Category::Api,
            CategoryFilter::Graphql => category == Category::Graphql,
            CategoryFilter::Config => category == Category::Config,
            CategoryFilter::Other => category == Category::Other,
        }
    }
}

/// One non-empty bucket of the results view
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub category: Category,
    pub items: Vec<String>,
}

impl Section {
    pub fn title(&self) -> &'static str {
        section_title(self.category)
    }
}

pub fn section_title(category: Category) -> &'static str {
    match category {
        Category::Endpoint => "Endpoints",
        Category::Api => "API Endpoints",
        Category::Graphql => "GraphQL",
        Category::Config => "Configuration",
        Category::Other => "Other",
    }
}

/// Buckets selected by `filter`, entries narrowed to those containing `search`
/// (case-insensitive). Empty sections are left out.
pub fn filter_results(results: &ResultSet, filter: CategoryFilter, search: &str) -> Vec<Section> {
    let needle = search.trim().to_lowercase();

    DISPLAY_ORDER
        .into_iter()
        .filter(|c| filter.includes(*c))
        .filter_map(|category| {
            let items: Vec<String> = results
                .bucket(category)
                .iter()
                .filter(|v| needle.is_empty() || v.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            (!items.is_empty()).then_some(Section { category, items })
        })
        .collect()
}

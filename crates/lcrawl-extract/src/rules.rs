use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("invalid selector `{0}`")]
    Selector(String),
}

/// Classification patterns, as found in configuration files.
///
/// All patterns are matched case-insensitively against whitespace-normalized
/// link text (or, for `pagination_path`, against the absolute link URL).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRules {
    /// Elements whose first match names the page, e.g. `5 клас`
    #[serde(default = "default_heading_selector")]
    pub heading_selector: String,

    /// Link text marking a category or listing page
    #[serde(default = "default_listing_cues")]
    pub listing_cues: Vec<String>,

    /// Heading text marking a grade page
    #[serde(default = "default_grade_pattern")]
    pub grade_pattern: String,

    /// Leading label of an item link, e.g. `А.1 Додавання дробів`
    #[serde(default = "default_record_label")]
    pub record_label: String,

    #[serde(default = "default_pagination_path")]
    pub pagination_path: String,

    #[serde(default = "default_pagination_labels")]
    pub pagination_labels: Vec<String>,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            heading_selector: default_heading_selector(),
            listing_cues: default_listing_cues(),
            grade_pattern: default_grade_pattern(),
            record_label: default_record_label(),
            pagination_path: default_pagination_path(),
            pagination_labels: default_pagination_labels(),
        }
    }
}

fn default_heading_selector() -> String {
    String::from("h1, .page-title, .title")
}

fn default_listing_cues() -> Vec<String> {
    vec![
        String::from("Переглянути"),
        String::from(r"\d+\s*рок"),
        String::from("клас"),
    ]
}

fn default_grade_pattern() -> String {
    String::from("клас")
}

fn default_record_label() -> String {
    String::from(r"^[A-ZА-ЯЄІЇҐ]\.?\s*\d+\b")
}

fn default_pagination_path() -> String {
    String::from(r"/page/\d+")
}

fn default_pagination_labels() -> Vec<String> {
    vec![
        String::from("Наступна"),
        String::from("Попередня"),
        String::from("Далі"),
        String::from("Сторінка"),
    ]
}

/// Compiled [`ExtractRules`]. Each predicate is independent of any page traversal.
#[derive(Debug, Clone)]
pub struct Rules {
    pub(crate) heading: Selector,
    listing_cues: RegexSet,
    grade: Regex,
    record_label: Regex,
    pagination_path: Regex,
    pagination_labels: RegexSet,
}

impl Rules {
    pub fn compile(rules: &ExtractRules) -> Result<Self, RulesError> {
        let heading = Selector::parse(&rules.heading_selector)
            .map_err(|_| RulesError::Selector(rules.heading_selector.clone()))?;

        let labels = rules
            .pagination_labels
            .iter()
            .map(|label| regex::escape(label))
            .collect::<Vec<_>>();

        Ok(Self {
            heading,
            listing_cues: set(&rules.listing_cues)?,
            grade: single(&rules.grade_pattern)?,
            record_label: single(&rules.record_label)?,
            pagination_path: single(&rules.pagination_path)?,
            pagination_labels: set(&labels)?,
        })
    }

    pub fn is_listing_cue(&self, text: &str) -> bool {
        self.listing_cues.is_match(text)
    }

    pub fn is_grade(&self, heading: &str) -> bool {
        self.grade.is_match(heading)
    }

    pub fn is_record_label(&self, text: &str) -> bool {
        self.record_label.is_match(text)
    }

    pub fn is_pagination(&self, url: &Url, text: &str) -> bool {
        self.pagination_path.is_match(url.as_str()) || self.pagination_labels.is_match(text)
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::compile(&ExtractRules::default()).expect("Default rules are valid")
    }
}

fn single(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn set<S: AsRef<str>>(patterns: &[S]) -> Result<RegexSet, regex::Error> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_labels() {
        let rules = Rules::default();
        assert!(rules.is_record_label("А.1 Додавання дробів"));
        assert!(rules.is_record_label("A.12 Fractions"));
        assert!(rules.is_record_label("б 3 Віднімання"));
        assert!(rules.is_record_label("Є.4 Площа"));
        assert!(!rules.is_record_label("Підсумок"));
        assert!(!rules.is_record_label("АБ.1 Два символи"));
        assert!(!rules.is_record_label("А.1x без межі"));
    }

    #[test]
    fn listing_cues() {
        let rules = Rules::default();
        assert!(rules.is_listing_cue("Переглянути всі"));
        assert!(rules.is_listing_cue("6 років"));
        assert!(rules.is_listing_cue("5 КЛАС"));
        assert!(!rules.is_listing_cue("Про нас"));
    }

    #[test]
    fn pagination() {
        let rules = Rules::default();
        let paged = Url::parse("https://learning.ua/matematyka/page/3/").unwrap();
        let plain = Url::parse("https://learning.ua/matematyka/5-klas/").unwrap();
        assert!(rules.is_pagination(&paged, "3"));
        assert!(rules.is_pagination(&plain, "Наступна"));
        assert!(rules.is_pagination(&plain, "далі →"));
        assert!(!rules.is_pagination(&plain, "5 клас"));
    }

    #[test]
    fn pagination_labels_are_literal() {
        let rules = Rules::compile(&ExtractRules {
            pagination_labels: vec![String::from("Next (1)")],
            ..Default::default()
        })
        .unwrap();
        let url = Url::parse("https://learning.ua/matematyka/").unwrap();
        assert!(rules.is_pagination(&url, "Next (1)"));
        assert!(!rules.is_pagination(&url, "Next 1"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Rules::compile(&ExtractRules {
            record_label: String::from("(unclosed"),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, RulesError::Pattern(_)));
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = Rules::compile(&ExtractRules {
            heading_selector: String::from("h1[["),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, RulesError::Selector(_)));
    }
}

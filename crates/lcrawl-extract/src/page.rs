use std::collections::HashSet;

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::record::{Context, Record};
use crate::rules::Rules;
use crate::site::Site;

lazy_static! {
    static ref ANCHORS: Selector = Selector::parse("a[href]").unwrap();
}

/// Collapses every run of whitespace into a single space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A parsed page along with the URL it was fetched from.
///
/// Every scan is a pure function of the document, the rules and the site.
pub struct Page {
    html: Html,
    url: Url,
}

impl Page {
    pub fn parse(html: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(html),
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Labels derived from the first heading of the page.
    pub fn context(&self, rules: &Rules) -> Context {
        let heading = self
            .html
            .select(&rules.heading)
            .next()
            .map(|el| normalize_whitespace(&text_of(el)))
            .unwrap_or_default();

        if heading.is_empty() {
            Context::default()
        } else if rules.is_grade(&heading) {
            Context {
                category: Some(heading.clone()),
                grade: Some(heading),
            }
        } else {
            Context {
                category: Some(heading),
                grade: None,
            }
        }
    }

    /// Links to category or listing pages of the target section.
    pub fn listing_links(&self, rules: &Rules, site: &Site) -> Vec<Url> {
        let links = self
            .anchors(site)
            .filter(|(url, text)| {
                !text.is_empty() && site.in_section(url) && rules.is_listing_cue(text)
            })
            .map(|(url, _)| url);
        unique(links)
    }

    /// One record stub per anchor whose text starts with an item label.
    pub fn records(&self, rules: &Rules, site: &Site, context: &Context) -> Vec<Record> {
        self.anchors(site)
            .filter(|(url, text)| {
                !text.is_empty() && site.is_same_site(url) && rules.is_record_label(text)
            })
            .map(|(url, text)| Record::stub(url.into(), text, context))
            .collect()
    }

    pub fn pagination_links(&self, rules: &Rules, site: &Site) -> Vec<Url> {
        let links = self
            .anchors(site)
            .filter(|(url, text)| site.in_section(url) && rules.is_pagination(url, text))
            .map(|(url, _)| url);
        unique(links)
    }

    /// Resolved targets and normalized texts of the page's anchors, in document order.
    /// The text is empty for icon-only links.
    fn anchors<'a>(&'a self, site: &'a Site) -> impl Iterator<Item = (Url, String)> + 'a {
        self.html.select(&ANCHORS).filter_map(move |el| {
            let href = el.value().attr("href")?;
            let url = site.resolve(href, &self.url)?;
            Some((url, normalize_whitespace(&text_of(el))))
        })
    }
}

fn text_of(el: ElementRef) -> String {
    el.text().collect()
}

fn unique(urls: impl Iterator<Item = Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.filter(|url| seen.insert(url.clone())).collect()
}

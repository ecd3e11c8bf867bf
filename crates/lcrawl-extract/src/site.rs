use url::{Origin, Url};

/// The crawled site: where relative links resolve and which pages belong to the target section.
#[derive(Debug, Clone)]
pub struct Site {
    origin: Url,
    seed: Url,
    section: String,
}

impl Site {
    /// Builds a site from its seed URL. The origin defaults to the seed's origin and
    /// the section to the seed's path.
    pub fn new(mut seed: Url, origin: Option<Url>, section: Option<String>) -> Self {
        seed.set_fragment(None);
        let origin = origin.unwrap_or_else(|| {
            let mut origin = seed.clone();
            origin.set_path("/");
            origin.set_query(None);
            origin.set_fragment(None);
            origin
        });
        let section = section.unwrap_or_else(|| seed.path().to_string());
        let section = if section.starts_with('/') {
            section
        } else {
            format!("/{section}")
        };
        Self {
            origin,
            seed,
            section,
        }
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    /// Normalizes a raw URL handed to the frontier: absolute URLs are kept, root-relative
    /// ones resolve against the origin and anything else against the seed.
    pub fn absolutize(&self, raw: &str) -> Option<Url> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) if raw.starts_with('/') => {
                self.origin.join(raw).ok()?
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => self.seed.join(raw).ok()?,
            Err(_) => return None,
        };
        web_url(url)
    }

    /// Resolves an href found on `page` against that page's URL.
    pub fn resolve(&self, href: &str, page: &Url) -> Option<Url> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
        {
            return None;
        }
        web_url(page.join(href).ok()?)
    }

    pub fn is_same_site(&self, url: &Url) -> bool {
        url.origin() == self.origin()
    }

    pub fn in_section(&self, url: &Url) -> bool {
        self.is_same_site(url) && url.path().starts_with(&self.section)
    }

    fn origin(&self) -> Origin {
        self.origin.origin()
    }
}

fn web_url(mut url: Url) -> Option<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        let seed = Url::parse("https://learning.ua/matematyka/").unwrap();
        Site::new(seed, None, None)
    }

    #[test]
    fn root_relative_and_absolute_agree() {
        let site = site();
        assert_eq!(
            site.absolutize("/matematyka/x"),
            site.absolutize("https://learning.ua/matematyka/x")
        );
    }

    #[test]
    fn frontier_relative_resolves_against_seed() {
        let url = site().absolutize("5-klas/").unwrap();
        assert_eq!(url.as_str(), "https://learning.ua/matematyka/5-klas/");
    }

    #[test]
    fn page_relative_resolves_against_page() {
        let site = site();
        let page = Url::parse("https://learning.ua/matematyka/5-klas/").unwrap();
        let url = site.resolve("a-1/", &page).unwrap();
        assert_eq!(url.as_str(), "https://learning.ua/matematyka/5-klas/a-1/");
    }

    #[test]
    fn skips_non_navigational_hrefs() {
        let site = site();
        let page = site.seed().clone();
        assert_eq!(site.resolve("#top", &page), None);
        assert_eq!(site.resolve("mailto:info@learning.ua", &page), None);
        assert_eq!(site.resolve("javascript:void(0)", &page), None);
        assert_eq!(site.resolve("  ", &page), None);
    }

    #[test]
    fn strips_fragments() {
        let url = site().absolutize("/matematyka/x#part").unwrap();
        assert_eq!(url.as_str(), "https://learning.ua/matematyka/x");
    }

    #[test]
    fn section_membership() {
        let site = site();
        assert!(site.in_section(&Url::parse("https://learning.ua/matematyka/page/2/").unwrap()));
        assert!(!site.in_section(&Url::parse("https://learning.ua/fizyka/").unwrap()));
        assert!(!site.in_section(&Url::parse("https://other.ua/matematyka/").unwrap()));
    }

    #[test]
    fn seed_fragment_is_stripped() {
        let seed = Url::parse("https://learning.ua/matematyka/#top").unwrap();
        let site = Site::new(seed, None, None);
        assert_eq!(site.seed().as_str(), "https://learning.ua/matematyka/");
        assert_eq!(site.absolutize("/matematyka/").as_ref(), Some(site.seed()));
    }

    #[test]
    fn explicit_section_gets_leading_slash() {
        let seed = Url::parse("https://learning.ua/").unwrap();
        let site = Site::new(seed, None, Some("matematyka/".into()));
        assert_eq!(site.section(), "/matematyka/");
    }
}

use std::collections::{HashSet, VecDeque};

use lcrawl_extract::{Context, Site};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// The seed page, links to category and listing pages
    Start,
    /// A page of item links, possibly paginated
    Listing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: Url,
    pub kind: PageKind,
    pub context: Context,
}

/// Discovered pages waiting to be visited, and every URL ever admitted.
///
/// A URL is admitted at most once, however many pages link to it.
#[derive(Debug)]
pub struct Frontier {
    site: Site,
    seen: HashSet<Url>,
    queue: VecDeque<WorkItem>,
}

impl Frontier {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            seen: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    /// Normalizes `raw` and admits it. Returns whether a new work item was queued.
    pub fn enqueue(&mut self, raw: &str, kind: PageKind, context: Context) -> bool {
        match self.site.absolutize(raw) {
            Some(url) => self.admit(url, kind, context),
            None => {
                log::debug!("Ignoring unresolvable URL: {raw}");
                false
            }
        }
    }

    pub fn admit(&mut self, url: Url, kind: PageKind, context: Context) -> bool {
        if !self.seen.insert(url.clone()) {
            return false;
        }
        self.queue.push_back(WorkItem { url, kind, context });
        true
    }

    pub fn next(&mut self) -> Option<WorkItem> {
        self.queue.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }
}

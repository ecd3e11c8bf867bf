mod page;
mod record;
mod rules;
mod site;

pub use page::{normalize_whitespace, Page};
pub use record::{Context, Record};
pub use rules::{ExtractRules, Rules, RulesError};
pub use site::Site;

pub use url;

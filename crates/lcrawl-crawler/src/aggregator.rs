use std::collections::HashMap;

use lcrawl_extract::Record;

/// Records extracted during discovery, in the order they were found.
#[derive(Debug, Default)]
pub struct Aggregator {
    records: Vec<Record>,
}

/// The outcome of [`Aggregator::into_unique`].
#[derive(Debug, Default)]
pub struct Unique {
    pub records: Vec<Record>,
    /// Duplicates whose category or grade disagreed with an earlier occurrence
    pub conflicts: usize,
}

impl Aggregator {
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keeps one record per URL, at the position of its first occurrence. When the same
    /// URL was found more than once, the last occurrence's fields win.
    pub fn into_unique(self) -> Unique {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<Record> = Vec::with_capacity(self.records.len());
        let mut conflicts = 0;

        for record in self.records {
            match index.get(&record.url) {
                Some(&i) => {
                    let kept = &mut unique[i];
                    if kept.context() != record.context() {
                        conflicts += 1;
                        log::warn!(
                            "Conflicting labels for {}: {:?} replaced by {:?}",
                            record.url,
                            kept.context(),
                            record.context()
                        );
                    }
                    *kept = record;
                }
                None => {
                    index.insert(record.url.clone(), unique.len());
                    unique.push(record);
                }
            }
        }

        Unique {
            records: unique,
            conflicts,
        }
    }
}

#[cfg(test)]
mod tests {
    use lcrawl_extract::Context;

    use super::*;

    fn record(url: &str, title: &str, grade: Option<&str>) -> Record {
        let context = Context {
            category: grade.map(String::from),
            grade: grade.map(String::from),
        };
        Record::stub(url.into(), title.into(), &context)
    }

    #[test]
    fn one_record_per_url() {
        let mut aggregator = Aggregator::default();
        aggregator.extend([
            record("https://learning.ua/a", "А.1 a", Some("5 клас")),
            record("https://learning.ua/b", "А.2 b", Some("5 клас")),
            record("https://learning.ua/a", "А.1 a", Some("5 клас")),
        ]);
        assert_eq!(aggregator.len(), 3);

        let unique = aggregator.into_unique();
        let urls = unique.records.iter().map(|r| r.url.as_str()).collect::<Vec<_>>();
        assert_eq!(urls, vec!["https://learning.ua/a", "https://learning.ua/b"]);
        assert_eq!(unique.conflicts, 0);
    }

    #[test]
    fn last_write_wins_on_conflict() {
        let mut aggregator = Aggregator::default();
        aggregator.push(record("https://learning.ua/a", "А.1 a", Some("5 клас")));
        aggregator.push(record("https://learning.ua/b", "А.2 b", None));
        aggregator.push(record("https://learning.ua/a", "А.1 a (again)", Some("6 клас")));

        let unique = aggregator.into_unique();
        assert_eq!(unique.records.len(), 2);
        assert_eq!(unique.records[0].url, "https://learning.ua/a");
        assert_eq!(unique.records[0].title, "А.1 a (again)");
        assert_eq!(unique.records[0].grade.as_deref(), Some("6 клас"));
        assert_eq!(unique.conflicts, 1);
    }

    #[test]
    fn empty_stays_empty() {
        let aggregator = Aggregator::default();
        assert!(aggregator.is_empty());
        assert!(aggregator.into_unique().records.is_empty());
    }
}

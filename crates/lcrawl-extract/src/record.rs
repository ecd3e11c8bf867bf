use serde::{Deserialize, Serialize};

/// Page-level labels inherited by every record found on that page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub category: Option<String>,
    pub grade: Option<String>,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.grade.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub url: String,
    pub title: String,
    pub category: Option<String>,
    pub grade: Option<String>,
    pub local_path: Option<String>,
}

impl Record {
    /// A record stub, as produced by extraction, before any archiving.
    pub fn stub(url: String, title: String, context: &Context) -> Self {
        Self {
            url,
            title,
            category: context.category.clone(),
            grade: context.grade.clone(),
            local_path: None,
        }
    }

    /// Attaches the outcome of the archive pass, `None` when the page couldn't be saved.
    pub fn archived(self, local_path: Option<String>) -> Self {
        Self { local_path, ..self }
    }

    pub fn context(&self) -> Context {
        Context {
            category: self.category.clone(),
            grade: self.grade.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_local_path_even_when_absent() {
        let record = Record::stub(
            String::from("https://learning.ua/matematyka/5-klas/a-1/"),
            String::from("А.1 Додавання дробів"),
            &Context::default(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["localPath"].is_null());

        let json = serde_json::to_value(record.archived(Some(String::from("x.html")))).unwrap();
        assert_eq!(json["localPath"], "x.html");
        assert!(json.get("local_path").is_none());
    }
}

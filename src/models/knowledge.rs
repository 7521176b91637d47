use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct KnowledgeEntry {
    pub knowledge_id: u64,
    pub content: String,
    pub content_type: String,
    pub machine_id: u64,
    pub solution: Option<String>,
    /// Filled in by joined queries only.
    #[serde(default)]
    pub machine_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct NewKnowledgeEntry {
    pub content: String,
    pub content_type: String,
    pub machine_id: u64,
    #[serde(default)]
    pub solution: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct KnowledgeFilter {
    pub machine_name: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SolutionUpdate {
    pub solution: String,
}

/// Case-insensitive substring match used for every content lookup.
pub fn content_matches(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl KnowledgeFilter {
    pub fn matches(&self, entry: &KnowledgeEntry) -> bool {
        let machine_ok = match &self.machine_name {
            Some(name) => entry.machine_name.as_deref() == Some(name.as_str()),
            None => true,
        };
        let content_ok = match &self.content {
            Some(c) => content_matches(&entry.content, c),
            None => true,
        };
        machine_ok && content_ok
    }
}

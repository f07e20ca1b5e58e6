use std::collections::HashMap;

use tracing::warn;

use crate::notion::TargetRecord;

/// Canvas id -> Notion page id, built from a full scan at the start of each run.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    pages: HashMap<String, String>,
}

impl IdentityIndex {
    /// Rows without an identity are ignored. When two rows share one, the
    /// first wins and the duplicate is reported.
    pub fn build(records: &[TargetRecord], identity_field: &str) -> Self {
        let mut pages: HashMap<String, String> = HashMap::with_capacity(records.len());

        for record in records {
            let Some(identity) = record
                .text(identity_field)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
            else {
                continue;
            };

            if let Some(existing) = pages.get(&identity) {
                warn!(
                    "Duplicate {} {:?}: keeping page {}, ignoring page {}",
                    identity_field, identity, existing, record.id
                );
                continue;
            }
            pages.insert(identity, record.id.clone());
        }

        Self { pages }
    }

    pub fn get(&self, identity: &str) -> Option<&str> {
        self.pages.get(identity).map(String::as_str)
    }

    pub fn insert(&mut self, identity: impl Into<String>, page_id: impl Into<String>) {
        self.pages.insert(identity.into(), page_id.into());
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

//! Free-text ranking over the catalog.
//!
//! Every whitespace-separated token of the query must occur, case-insensitively,
//! in at least one of `name`, either composition field or `category`.
//! Matches are ordered by how many tokens their `name` contains, highest
//! first; equal counts keep catalog order.

use crate::domain::CatalogEntry;

/// Lowercased, whitespace-separated query tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Ranked matches for `query`. A query without tokens matches nothing.
pub fn search(query: &str, catalog: &[CatalogEntry]) -> Vec<CatalogEntry> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, &CatalogEntry)> = catalog
        .iter()
        .filter_map(|entry| {
            let fields = SearchFields::of(entry);
            tokens
                .iter()
                .all(|token| fields.contains(token))
                .then(|| (fields.name_hits(&tokens), entry))
        })
        .collect();

    // stable: ties keep catalog order
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, entry)| entry.clone()).collect()
}

struct SearchFields {
    name: String,
    others: [String; 3],
}

impl SearchFields {
    fn of(entry: &CatalogEntry) -> Self {
        Self {
            name: entry.name.to_lowercase(),
            others: [
                entry.composition1.to_lowercase(),
                entry
                    .composition2
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase(),
                entry.category.to_lowercase(),
            ],
        }
    }

    fn contains(&self, token: &str) -> bool {
        self.name.contains(token) || self.others.iter().any(|field| field.contains(token))
    }

    fn name_hits(&self, tokens: &[String]) -> usize {
        tokens.iter().filter(|token| self.name.contains(token.as_str())).count()
    }
}

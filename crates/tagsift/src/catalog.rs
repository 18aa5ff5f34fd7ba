//
// catalog.rs
//
// In-memory category and album catalog implementing the remote contracts
//

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::autocomplete::{Creation, SuggestionItem, SuggestionSource};
use crate::filter::{Category, CategorySource, ListingSource};
use crate::sorted_set::{CategoryId, SortedIndexSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub categories: Vec<CategoryId>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogData {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    albums: Vec<Album>,
}

/// Catalog held in memory, answering lookups after a fixed latency.
///
/// Lookup is a case-insensitive substring match on the category name.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    data: Arc<RwLock<CatalogData>>,
    latency: Duration,
}

impl InMemoryCatalog {
    pub fn new(categories: Vec<Category>, albums: Vec<Album>) -> Self {
        Self {
            data: Arc::new(RwLock::new(CatalogData { categories, albums })),
            latency: Duration::ZERO,
        }
    }

    /// Parse `{"categories": [...], "albums": [...]}`
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let data: CatalogData = serde_json::from_str(json)?;
        Ok(Self::new(data.categories, data.albums))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SuggestionSource<CategoryId> for InMemoryCatalog {
    async fn query(&self, text: &str) -> anyhow::Result<Vec<SuggestionItem<CategoryId>>> {
        Self::simulate_latency(self.latency).await;
        let needle = text.to_lowercase();
        let data = self.data.read().await;
        Ok(data
            .categories
            .iter()
            .filter(|c| c.category.to_lowercase().contains(&needle))
            .map(|c| SuggestionItem::new(c.id, c.category.clone()))
            .collect())
    }

    fn supports_create(&self) -> bool {
        true
    }

    fn create(&self, text: &str) -> Creation<CategoryId> {
        let data = self.data.clone();
        let latency = self.latency;
        let name = text.trim().to_string();
        Creation::Pending(Box::pin(async move {
            Self::simulate_latency(latency).await;
            if name.is_empty() {
                anyhow::bail!("category name must not be empty");
            }
            let mut data = data.write().await;
            if let Some(existing) = data.categories.iter().find(|c| c.category == name) {
                return Ok(Some(SuggestionItem::new(existing.id, existing.category.clone())));
            }
            let id = data.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1;
            data.categories.push(Category {
                id,
                category: name.clone(),
            });
            log::info!("Created category {} ({})", name, id);
            Ok(Some(SuggestionItem::new(id, name)))
        }))
    }
}

#[async_trait]
impl CategorySource for InMemoryCatalog {
    async fn categories(&self) -> anyhow::Result<Vec<Category>> {
        Self::simulate_latency(self.latency).await;
        Ok(self.data.read().await.categories.clone())
    }
}

#[async_trait]
impl ListingSource<Album> for InMemoryCatalog {
    /// Albums tagged with every selected category
    async fn fetch(&self, filters: &SortedIndexSet) -> anyhow::Result<Vec<Album>> {
        Self::simulate_latency(self.latency).await;
        let data = self.data.read().await;
        Ok(data
            .albums
            .iter()
            .filter(|album| filters.iter().all(|id| album.categories.contains(id)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_json(
            r#"{
                "categories": [
                    {"id": 1, "category": "Cats"},
                    {"id": 2, "category": "Dogs"},
                    {"id": 3, "category": "Catalogs"}
                ],
                "albums": [
                    {"id": 10, "title": "Kittens", "categories": [1]},
                    {"id": 11, "title": "Pets", "categories": [1, 2]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_query_matches_substring_case_insensitive() {
        let items = catalog().query("cat").await.unwrap();
        let labels: Vec<_> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(labels, vec!["Cats", "Catalogs"]);
    }

    #[tokio::test]
    async fn test_create_assigns_next_id_and_reuses_existing() {
        let catalog = catalog();
        let Creation::Pending(fut) = catalog.create("Birds") else {
            panic!("expected pending creation");
        };
        assert_eq!(fut.await.unwrap(), Some(SuggestionItem::new(4, "Birds")));

        let Creation::Pending(fut) = catalog.create("Dogs") else {
            panic!("expected pending creation");
        };
        assert_eq!(fut.await.unwrap(), Some(SuggestionItem::new(2, "Dogs")));
        assert_eq!(catalog.categories().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_create_rejects_blank() {
        let Creation::Pending(fut) = catalog().create("   ") else {
            panic!("expected pending creation");
        };
        assert!(fut.await.is_err());
    }

    #[tokio::test]
    async fn test_album_listing_requires_all_filters() {
        let catalog = catalog();
        let all = catalog.fetch(&SortedIndexSet::new()).await.unwrap();
        assert_eq!(all.len(), 2);
        let both = catalog
            .fetch(&SortedIndexSet::from(vec![1, 2]))
            .await
            .unwrap();
        assert_eq!(both.iter().map(|a| a.id).collect::<Vec<_>>(), vec![11]);
    }
}

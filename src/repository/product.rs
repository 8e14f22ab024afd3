//! Product catalog with cache-aside reads.
//!
//! The seed catalog is authoritative. The cache only shortens the path:
//! `product:{id}` and `products:page:{page}:{limit}` expire after the
//! configured TTL and are rebuilt from the catalog on the next miss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::cache::CacheClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

impl Product {
    fn new(id: u64, name: &str, price: f64, stock: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            price,
            stock,
        }
    }
}

/// Built-in catalog.
pub fn seed_catalog() -> Vec<Product> {
    vec![
        Product::new(1, "Camisa", 50.0, 10),
        Product::new(2, "Calça", 100.0, 5),
        Product::new(3, "Tênis", 200.0, 8),
        Product::new(4, "Jaqueta", 280.0, 3),
        Product::new(5, "Meia", 20.0, 15),
    ]
}

pub fn product_key(id: u64) -> String {
    format!("product:{id}")
}

fn page_key(page: usize, limit: usize) -> String {
    format!("products:page:{page}:{limit}")
}

#[derive(Debug)]
pub struct ProductRepository {
    cache: Arc<CacheClient>,
    catalog: Vec<Product>,
    ttl_secs: u64,
    max_page_size: usize,
}

impl ProductRepository {
    pub fn new(cache: Arc<CacheClient>, catalog: Vec<Product>, ttl_secs: u64, max_page_size: usize) -> Self {
        Self {
            cache,
            catalog,
            ttl_secs,
            max_page_size,
        }
    }

    pub fn total(&self) -> usize {
        self.catalog.len()
    }

    /// Clamp raw paging input: page ≥ 1, 1 ≤ limit ≤ max page size.
    pub fn normalize(&self, page: Option<usize>, limit: Option<usize>) -> (usize, usize) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(10).clamp(1, self.max_page_size.max(1));
        (page, limit)
    }

    pub async fn find(&self, id: u64) -> Option<Product> {
        let key = product_key(id);
        if let Some(product) = self.cache.get::<Product>(&key).await {
            return Some(product);
        }

        let product = self.catalog.iter().find(|p| p.id == id)?.clone();
        self.cache.set(&key, &product, self.ttl_secs).await;
        Some(product)
    }

    /// One page of the catalog. Out-of-range pages are empty.
    pub async fn page(&self, page: usize, limit: usize) -> Vec<Product> {
        let key = page_key(page, limit);
        if let Some(products) = self.cache.get::<Vec<Product>>(&key).await {
            return products;
        }

        let start = page.saturating_sub(1).saturating_mul(limit);
        let products: Vec<Product> = self.catalog.iter().skip(start).take(limit).cloned().collect();
        self.cache.set(&key, &products, self.ttl_secs).await;
        products
    }
}

/// Keep only the named fields of each product. Unknown names are ignored;
/// an empty field list returns the products unchanged.
pub fn project(products: &[Product], fields: &[&str]) -> Vec<Value> {
    products
        .iter()
        .map(|product| {
            let full = serde_json::to_value(product).unwrap_or(Value::Null);
            if fields.is_empty() {
                return full;
            }
            match full {
                Value::Object(map) => {
                    let kept: Map<String, Value> = map
                        .into_iter()
                        .filter(|(name, _)| fields.contains(&name.as_str()))
                        .collect();
                    Value::Object(kept)
                }
                other => other,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheClientConfig, MemoryConnector};
    use serde_json::json;

    fn repo() -> (ProductRepository, Arc<CacheClient>) {
        let cache = Arc::new(CacheClient::new(
            Arc::new(MemoryConnector::new()),
            CacheClientConfig::default(),
        ));
        (ProductRepository::new(cache.clone(), seed_catalog(), 600, 100), cache)
    }

    #[tokio::test]
    async fn test_find_populates_cache() {
        let (repo, cache) = repo();
        assert!(!cache.exists("product:3").await);

        let product = repo.find(3).await.unwrap();
        assert_eq!(product.name, "Tênis");
        assert_eq!(cache.get::<Product>("product:3").await, Some(product));

        assert!(repo.find(42).await.is_none());
        assert!(!cache.exists("product:42").await);
    }

    #[tokio::test]
    async fn test_find_prefers_cached_copy() {
        let (repo, cache) = repo();
        cache.set("product:1", &Product::new(1, "Camisa Polo", 55.0, 2), 600).await;

        assert_eq!(repo.find(1).await.unwrap().name, "Camisa Polo");
    }

    #[tokio::test]
    async fn test_page_slices_catalog() {
        let (repo, _) = repo();
        let ids: Vec<u64> = repo.page(2, 2).await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!(repo.page(4, 2).await.is_empty());
    }

    #[test]
    fn test_normalize() {
        let (repo, _) = repo();
        assert_eq!(repo.normalize(None, None), (1, 10));
        assert_eq!(repo.normalize(Some(0), Some(0)), (1, 1));
        assert_eq!(repo.normalize(Some(3), Some(500)), (3, 100));
    }

    #[test]
    fn test_project() {
        let products = vec![Product::new(5, "Meia", 20.0, 15)];
        assert_eq!(project(&products, &["name", "price", "bogus"]), vec![json!({"name": "Meia", "price": 20.0})]);
        assert_eq!(project(&products, &[])[0]["stock"], json!(15));
    }
}

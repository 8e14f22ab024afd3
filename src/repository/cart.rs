//! Shopping carts stored in the cache.
//!
//! Keys:
//! - `cart:{id}`: the cart document, no expiry
//! - `carts:list`: JSON array of cart ids, no expiry

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::CacheClient;
use crate::repository::FieldError;

pub const CARTS_INDEX_KEY: &str = "carts:list";

pub fn cart_key(id: u64) -> String {
    format!("cart:{id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub order_date: String,
    pub items: Vec<CartItem>,
    pub total: f64,
}

/// Body of a create request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCart {
    pub name: String,
    pub email: String,
    pub order_date: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Body of a partial update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub order_date: Option<String>,
    pub items: Option<Vec<CartItem>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartStats {
    pub total_carts: usize,
    pub cart_ids: Vec<u64>,
    /// Human-readable summary of what the store holds.
    pub memory_usage: String,
    pub cache_keys: Vec<String>,
}

impl NewCart {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_name(&mut errors, &self.name);
        check_email(&mut errors, &self.email);
        check_order_date(&mut errors, &self.order_date);
        check_items(&mut errors, &self.items);
        into_result(errors)
    }
}

impl CartUpdate {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(email) = &self.email {
            check_email(&mut errors, email);
        }
        if let Some(date) = &self.order_date {
            check_order_date(&mut errors, date);
        }
        if let Some(items) = &self.items {
            check_items(&mut errors, items);
        }
        into_result(errors)
    }
}

fn into_result(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_name(errors: &mut Vec<FieldError>, name: &str) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }
}

fn check_email(errors: &mut Vec<FieldError>, email: &str) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }
}

fn check_order_date(errors: &mut Vec<FieldError>, date: &str) {
    let valid = DateTime::parse_from_rfc3339(date).is_ok()
        || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok();
    if !valid {
        errors.push(FieldError::new("orderDate", "must be an ISO 8601 date"));
    }
}

fn check_items(errors: &mut Vec<FieldError>, items: &[CartItem]) {
    let before = errors.len();
    for (i, item) in items.iter().enumerate() {
        if item.product.trim().is_empty() {
            errors.push(FieldError::new(format!("items[{i}].product"), "must not be empty"));
        }
        if !item.price.is_finite() || item.price < 0.0 {
            errors.push(FieldError::new(format!("items[{i}].price"), "must be a number >= 0"));
        }
        if item.quantity < 1 {
            errors.push(FieldError::new(format!("items[{i}].quantity"), "must be >= 1"));
        }
    }
    // A non-finite total serializes as null and the stored cart stops decoding.
    if errors.len() == before && !cart_total(items).is_finite() {
        errors.push(FieldError::new("items", "total must be a finite number"));
    }
}

/// Sum of price × quantity.
pub fn cart_total(items: &[CartItem]) -> f64 {
    items.iter().map(|item| item.price * f64::from(item.quantity)).sum()
}

/// Carts kept entirely in the cache.
#[derive(Debug)]
pub struct CartRepository {
    cache: Arc<CacheClient>,
    next_id: AtomicU64,
    /// Serializes read-modify-write of the id index within this process.
    index_lock: Mutex<()>,
}

impl CartRepository {
    pub fn new(cache: Arc<CacheClient>) -> Self {
        Self {
            cache,
            next_id: AtomicU64::new(1),
            index_lock: Mutex::new(()),
        }
    }

    async fn load_index(&self) -> Vec<u64> {
        self.cache.get(CARTS_INDEX_KEY).await.unwrap_or_default()
    }

    pub async fn create(&self, new: NewCart) -> Cart {
        let _guard = self.index_lock.lock().await;
        let mut ids = self.load_index().await;

        // Never reuse an id that is already listed, e.g. after a restart.
        let floor = ids.iter().max().map_or(1, |max| max + 1);
        self.next_id.fetch_max(floor, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let cart = Cart {
            id,
            total: cart_total(&new.items),
            name: new.name,
            email: new.email,
            order_date: new.order_date,
            items: new.items,
        };

        self.cache.set(&cart_key(id), &cart, 0).await;
        ids.push(id);
        self.cache.set(CARTS_INDEX_KEY, &ids, 0).await;

        tracing::info!(cart_id = id, items = cart.items.len(), total = cart.total, "Cart created");
        cart
    }

    pub async fn list(&self) -> Vec<Cart> {
        let ids = self.load_index().await;
        let mut carts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(cart) = self.find(id).await {
                carts.push(cart);
            }
        }
        carts
    }

    pub async fn find(&self, id: u64) -> Option<Cart> {
        self.cache.get(&cart_key(id)).await
    }

    pub async fn update(&self, id: u64, update: CartUpdate) -> Option<Cart> {
        let mut cart = self.find(id).await?;

        if let Some(name) = update.name {
            cart.name = name;
        }
        if let Some(email) = update.email {
            cart.email = email;
        }
        if let Some(order_date) = update.order_date {
            cart.order_date = order_date;
        }
        if let Some(items) = update.items {
            cart.total = cart_total(&items);
            cart.items = items;
        }

        self.cache.set(&cart_key(id), &cart, 0).await;
        tracing::info!(cart_id = id, "Cart updated");
        Some(cart)
    }

    pub async fn remove(&self, id: u64) -> Option<Cart> {
        let cart = self.find(id).await?;
        self.cache.del(&cart_key(id)).await;

        let _guard = self.index_lock.lock().await;
        let mut ids = self.load_index().await;
        ids.retain(|listed| *listed != id);
        self.cache.set(CARTS_INDEX_KEY, &ids, 0).await;

        tracing::info!(cart_id = id, "Cart removed");
        Some(cart)
    }

    pub async fn stats(&self) -> CartStats {
        let ids = self.load_index().await;
        let carts = self.list().await;
        let mut cache_keys: Vec<String> = ids.iter().map(|id| cart_key(*id)).collect();
        cache_keys.push(CARTS_INDEX_KEY.to_string());

        CartStats {
            total_carts: carts.len(),
            cart_ids: ids,
            memory_usage: format!("{} storing {} carts", self.cache.backend(), carts.len()),
            cache_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheClientConfig, MemoryConnector};

    fn repo() -> (CartRepository, Arc<CacheClient>) {
        let cache = Arc::new(CacheClient::new(
            Arc::new(MemoryConnector::new()),
            CacheClientConfig::default(),
        ));
        (CartRepository::new(cache.clone()), cache)
    }

    fn new_cart(name: &str) -> NewCart {
        NewCart {
            name: name.to_string(),
            email: "ana@example.com".to_string(),
            order_date: "2024-05-01".to_string(),
            items: vec![
                CartItem { product: "Camisa".into(), price: 50.0, quantity: 2 },
                CartItem { product: "Meia".into(), price: 20.0, quantity: 1 },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_computes_total_and_indexes() {
        let (repo, cache) = repo();
        let cart = repo.create(new_cart("Ana")).await;

        assert_eq!(cart.id, 1);
        assert_eq!(cart.total, 120.0);
        assert_eq!(cache.get::<Vec<u64>>(CARTS_INDEX_KEY).await, Some(vec![1]));
        assert_eq!(repo.find(1).await, Some(cart));
    }

    #[tokio::test]
    async fn test_ids_continue_after_existing_index() {
        let (repo, cache) = repo();
        cache.set(CARTS_INDEX_KEY, &vec![7u64, 3], 0).await;

        let cart = repo.create(new_cart("Bia")).await;
        assert_eq!(cart.id, 8);
    }

    #[tokio::test]
    async fn test_update_recomputes_total_only_with_items() {
        let (repo, _) = repo();
        repo.create(new_cart("Ana")).await;

        let renamed = repo
            .update(1, CartUpdate { name: Some("Ana Maria".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ana Maria");
        assert_eq!(renamed.total, 120.0);

        let update = CartUpdate {
            items: Some(vec![CartItem { product: "Tênis".into(), price: 200.0, quantity: 3 }]),
            ..Default::default()
        };
        let repriced = repo.update(1, update).await.unwrap();
        assert_eq!(repriced.total, 600.0);
        assert_eq!(repo.find(1).await.unwrap().total, 600.0);

        assert!(repo.update(99, CartUpdate::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_drops_key_and_index_entry() {
        let (repo, cache) = repo();
        repo.create(new_cart("Ana")).await;
        repo.create(new_cart("Bia")).await;

        let removed = repo.remove(1).await.unwrap();
        assert_eq!(removed.name, "Ana");
        assert!(!cache.exists(&cart_key(1)).await);
        assert_eq!(cache.get::<Vec<u64>>(CARTS_INDEX_KEY).await, Some(vec![2]));
        assert!(repo.remove(1).await.is_none());

        let names: Vec<String> = repo.list().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Bia"]);
    }

    #[tokio::test]
    async fn test_stats() {
        let (repo, _) = repo();
        repo.create(new_cart("Ana")).await;
        repo.create(new_cart("Bia")).await;

        let stats = repo.stats().await;
        assert_eq!(stats.total_carts, 2);
        assert_eq!(stats.cart_ids, vec![1, 2]);
        assert_eq!(stats.memory_usage, "memory storing 2 carts");
        assert_eq!(stats.cache_keys, vec!["cart:1", "cart:2", "carts:list"]);
    }

    #[test]
    fn test_validation() {
        assert!(new_cart("Ana").validate().is_ok());

        let bad = NewCart {
            name: " ".into(),
            email: "not-an-email".into(),
            order_date: "yesterday".into(),
            items: vec![CartItem { product: "Calça".into(), price: -1.0, quantity: 0 }],
        };
        let fields: Vec<String> = bad.validate().unwrap_err().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["name", "email", "orderDate", "items[0].price", "items[0].quantity"]
        );

        let huge = vec![CartItem { product: "Jaqueta".into(), price: 1e308, quantity: 2 }];
        let overflow = NewCart { items: huge.clone(), ..new_cart("Ana") };
        let err = overflow.validate().unwrap_err();
        assert_eq!(err, vec![FieldError::new("items", "total must be a finite number")]);
        let overflow = CartUpdate { items: Some(huge), ..Default::default() };
        assert!(overflow.validate().is_err());

        let rfc3339 = CartUpdate {
            order_date: Some("2024-05-01T10:00:00Z".into()),
            ..Default::default()
        };
        assert!(rfc3339.validate().is_ok());
    }
}

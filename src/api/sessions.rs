//! One cart store per browser session.
//!
//! The registry only holds carts that have something in them. Reads of a
//! session that is not open are answered from a throwaway store, each open
//! cart has its own lock, and mutations (including the storage write) run
//! on the blocking pool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};

use super::events::SessionEvent;
use crate::domain::{CartKey, PricingPolicy};
use crate::store::{CartStore, JsonFileStorage, MemoryStorage};
use crate::Result;

#[derive(Clone, Debug)]
pub enum CartBackend {
    Memory,
    /// `<dir>/<session>.json`
    Directory(PathBuf),
}

struct OpenCart {
    store: Arc<Mutex<CartStore>>,
    last_used: Instant,
}

pub struct SessionCarts {
    backend: CartBackend,
    policy: Arc<PricingPolicy>,
    capacity: usize,
    open: Mutex<HashMap<CartKey, OpenCart>>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl SessionCarts {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new(backend: CartBackend, policy: Arc<PricingPolicy>) -> Self {
        Self { backend, policy, capacity: Self::DEFAULT_CAPACITY, open: Mutex::new(HashMap::new()), events: None }
    }

    /// Caps the number of open carts. Past the cap the least recently used
    /// idle cart is closed; with the memory backend its contents are lost.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Every store opened from now on reports its changes to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn policy(&self) -> &PricingPolicy { &self.policy }

    /// Runs a mutation against the session's store, opening it on first use.
    /// Only calls for the same session wait on each other.
    pub async fn with_cart<T, F>(&self, key: &CartKey, f: F) -> Result<T>
    where
        F: FnOnce(&mut CartStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let cart = self.acquire(key).await?;
        let mut guard = Arc::clone(&cart).lock_owned().await;
        let result = tokio::task::spawn_blocking(move || f(&mut guard)).await?;
        self.release(key, cart).await;
        Ok(result)
    }

    /// Reads the session's cart without opening it.
    pub async fn read_cart<T>(&self, key: &CartKey, f: impl FnOnce(&CartStore) -> T) -> Result<T> {
        let existing = self.touch(key).await;
        match existing {
            Some(cart) => Ok(f(&*cart.lock().await)),
            None => Ok(f(&self.load(key).await?)),
        }
    }

    pub async fn open_sessions(&self) -> usize { self.open.lock().await.len() }

    async fn touch(&self, key: &CartKey) -> Option<Arc<Mutex<CartStore>>> {
        let mut open = self.open.lock().await;
        open.get_mut(key).map(|entry| {
            entry.last_used = Instant::now();
            Arc::clone(&entry.store)
        })
    }

    async fn acquire(&self, key: &CartKey) -> Result<Arc<Mutex<CartStore>>> {
        if let Some(cart) = self.touch(key).await {
            return Ok(cart);
        }
        let store = self.load(key).await?;
        let mut open = self.open.lock().await;
        if !open.contains_key(key) && open.len() >= self.capacity {
            evict_idle(&mut open);
        }
        let entry = open
            .entry(key.clone())
            .or_insert_with(|| OpenCart { store: Arc::new(Mutex::new(store)), last_used: Instant::now() });
        entry.last_used = Instant::now();
        Ok(Arc::clone(&entry.store))
    }

    /// Closes the cart once it is empty and nobody else holds it.
    async fn release(&self, key: &CartKey, cart: Arc<Mutex<CartStore>>) {
        let mut open = self.open.lock().await;
        if Arc::strong_count(&cart) != 2 {
            return;
        }
        let empty = match cart.try_lock() {
            Ok(store) => store.cart().is_empty() && store.cart().coupon().is_none(),
            Err(_) => false,
        };
        if empty {
            open.remove(key);
            tracing::debug!(session = %key, "closed empty session cart");
        }
    }

    async fn load(&self, key: &CartKey) -> Result<CartStore> {
        let policy = Arc::clone(&self.policy);
        let mut store = match &self.backend {
            CartBackend::Memory => CartStore::open(MemoryStorage::new(), policy),
            CartBackend::Directory(dir) => {
                let storage = JsonFileStorage::new(dir, key);
                tokio::task::spawn_blocking(move || CartStore::open(storage, policy)).await?
            }
        };
        tracing::debug!(session = %key, items = store.total_items(), "loaded session cart");
        if let Some(tx) = self.events.clone() {
            let session = key.to_string();
            store.subscribe(move |event, _| {
                let _ = tx.send(SessionEvent { session: session.clone(), event: event.clone() });
            });
        }
        Ok(store)
    }
}

fn evict_idle(open: &mut HashMap<CartKey, OpenCart>) {
    let oldest = open
        .iter()
        .filter(|(_, entry)| Arc::strong_count(&entry.store) == 1)
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        open.remove(&key);
        tracing::info!(session = %key, "closed least recently used session cart");
    }
}

//! Durable storage for one cart's line items.
//!
//! Every backend stores the same format: a JSON array of line items in
//! insertion order.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::domain::{CartKey, CartLineItem};
use crate::Result;

pub trait CartStorage: Send {
    /// Stored items, or an empty list when nothing was ever saved.
    fn load(&self) -> Result<Vec<CartLineItem>>;
    fn save(&self, items: &[CartLineItem]) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-process storage. Clones share the same slot, which lets two stores
/// observe each other's writes the way two tabs share one storage key.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    /// Raw persisted payload, if any.
    pub fn raw(&self) -> Option<String> {
        self.with_slot(|slot| slot.clone())
    }

    fn with_slot<T>(&self, f: impl FnOnce(&mut Option<String>) -> T) -> T {
        let mut guard = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<CartLineItem>> {
        match self.raw() {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, items: &[CartLineItem]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.with_slot(|slot| *slot = Some(json));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.with_slot(|slot| *slot = None);
        Ok(())
    }
}

/// One `<key>.json` file per cart inside a directory.
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl AsRef<Path>, key: &CartKey) -> Self {
        Self { path: dir.as_ref().join(format!("{}.json", key.as_str())) }
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl CartStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<CartLineItem>> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, items: &[CartLineItem]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cart, Money, ProductSnapshot};

    fn sample_items() -> Vec<CartLineItem> {
        let mut cart = Cart::new();
        cart.add_item(ProductSnapshot { id: "p1".into(), name: "Lamp".into(), price: Money::new(120_000), image: Some("https://cdn.example/lamp.jpg".into()) }, 2);
        cart.add_item(ProductSnapshot { id: "p2".into(), name: "Rug".into(), price: Money::new(80_000), image: None }, 1);
        cart.items().to_vec()
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path(), &CartKey::new("session-1").unwrap());
        assert!(storage.load().unwrap().is_empty());

        let items = sample_items();
        storage.save(&items).unwrap();
        assert_eq!(storage.load().unwrap(), items);
        assert!(!storage.path().with_extension("json.tmp").exists());

        storage.clear().unwrap();
        assert!(!storage.path().exists());
        storage.clear().unwrap();
    }

    #[test]
    fn test_stored_format() {
        let storage = MemoryStorage::new();
        storage.save(&sample_items()).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&storage.raw().unwrap()).unwrap();
        assert_eq!(raw[0]["id"], "p1");
        assert_eq!(raw[0]["price"], 120_000);
        assert_eq!(raw[0]["quantity"], 2);
        assert_eq!(raw[0]["image"], "https://cdn.example/lamp.jpg");
        assert!(raw[1].get("image").is_none());
    }

    #[test]
    fn test_legacy_payload_without_timestamp() {
        let storage = MemoryStorage::new();
        storage.with_slot(|slot| {
            *slot = Some(r#"[{"id":"p9","name":"Mug","price":30000,"quantity":3,"image":null}]"#.into())
        });
        let items = storage.load().unwrap();
        assert_eq!(items[0].quantity.value(), 3);
        assert_eq!(items[0].image, None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path(), &CartKey::new("broken").unwrap());
        fs::write(storage.path(), "{not json").unwrap();
        assert!(storage.load().is_err());
    }
}

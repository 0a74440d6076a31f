//! In-memory laptop catalog.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;

use crate::application::context::CallContext;
use crate::application::ports::{LaptopStore, MatchSink, StoreError};
use crate::domain::filter::{Filter, matches};
use crate::domain::laptop::Laptop;

/// Volatile catalog keyed by laptop id.
///
/// `save` takes the write lock; `find` and `search` share the read lock, and
/// `search` keeps it for the whole scan so it never observes a half-applied
/// write. Values are cloned on the way in and on the way out.
#[derive(Debug, Default)]
pub struct InMemoryLaptopStore {
    laptops: RwLock<HashMap<String, Laptop>>,
}

impl InMemoryLaptopStore {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LaptopStore for InMemoryLaptopStore {
    fn save(&self, laptop: &Laptop) -> Result<(), StoreError> {
        let mut laptops = self.laptops.write();
        match laptops.entry(laptop.id.clone()) {
            Entry::Occupied(slot) => Err(StoreError::AlreadyExists(slot.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(laptop.clone());
                Ok(())
            }
        }
    }

    fn find(&self, id: &str) -> Result<Option<Laptop>, StoreError> {
        Ok(self.laptops.read().get(id).cloned())
    }

    fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        found: &mut MatchSink<'_>,
    ) -> Result<(), StoreError> {
        let laptops = self.laptops.read();
        for laptop in laptops.values() {
            ctx.check()?;
            if matches(filter, laptop) {
                found(laptop.clone())?;
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.laptops.read().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::application::context::Interrupted;
    use crate::sample;

    fn ctx() -> CallContext {
        CallContext::new(CancellationToken::new())
    }

    fn collect(store: &InMemoryLaptopStore, filter: &Filter) -> Vec<Laptop> {
        let mut out = Vec::new();
        store
            .search(&ctx(), filter, &mut |laptop| {
                out.push(laptop);
                Ok(())
            })
            .unwrap();
        out
    }

    fn everything() -> Filter {
        Filter {
            max_price_usd: f64::MAX,
            ..Filter::default()
        }
    }

    #[test]
    fn save_then_find_returns_equal_value() {
        let store = InMemoryLaptopStore::new();
        let laptop = sample::new_laptop();

        store.save(&laptop).unwrap();

        assert_eq!(store.find(&laptop.id).unwrap(), Some(laptop));
    }

    #[test]
    fn find_missing_is_none() {
        let store = InMemoryLaptopStore::new();
        assert_eq!(store.find("missing").unwrap(), None);
    }

    #[test]
    fn duplicate_save_keeps_first_value() {
        let store = InMemoryLaptopStore::new();
        let first = sample::new_laptop();
        let mut second = sample::new_laptop();
        second.id.clone_from(&first.id);
        second.brand = "Other".to_string();

        store.save(&first).unwrap();
        let err = store.save(&second).unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists(ref id) if *id == first.id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.find(&first.id).unwrap(), Some(first));
    }

    #[test]
    fn caller_mutation_after_save_does_not_leak() {
        let store = InMemoryLaptopStore::new();
        let mut laptop = sample::new_laptop();
        store.save(&laptop).unwrap();
        let snapshot = laptop.clone();

        laptop.brand = "Mutated".to_string();
        laptop.gpus.clear();
        laptop.storages.push(laptop.storages[0].clone());

        assert_eq!(store.find(&laptop.id).unwrap(), Some(snapshot));
    }

    #[test]
    fn mutating_found_value_does_not_leak() {
        let store = InMemoryLaptopStore::new();
        let laptop = sample::new_laptop();
        store.save(&laptop).unwrap();

        let mut found = store.find(&laptop.id).unwrap().unwrap();
        found.price_usd = 1.0;
        if let Some(cpu) = found.cpu.as_mut() {
            cpu.number_cores = 99;
        }

        assert_eq!(store.find(&laptop.id).unwrap(), Some(laptop));
    }

    #[test]
    fn mutating_search_result_does_not_leak() {
        let store = InMemoryLaptopStore::new();
        let laptop = sample::new_laptop();
        store.save(&laptop).unwrap();

        let mut results = collect(&store, &everything());
        results[0].gpus.clear();

        assert_eq!(store.find(&laptop.id).unwrap(), Some(laptop));
    }

    #[test]
    fn search_visits_every_match_once() {
        let store = InMemoryLaptopStore::new();
        let mut ids: Vec<String> = (0..20)
            .map(|_| {
                let laptop = sample::new_laptop();
                store.save(&laptop).unwrap();
                laptop.id
            })
            .collect();

        let mut found: Vec<String> = collect(&store, &everything())
            .into_iter()
            .map(|laptop| laptop.id)
            .collect();

        ids.sort();
        found.sort();
        assert_eq!(found, ids);
    }

    #[test]
    fn search_stops_when_cancelled() {
        let store = InMemoryLaptopStore::new();
        for _ in 0..5 {
            store.save(&sample::new_laptop()).unwrap();
        }
        let ctx = ctx();
        let mut delivered = 0;

        let err = store
            .search(&ctx, &everything(), &mut |_| {
                delivered += 1;
                ctx.cancel();
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Interrupted(Interrupted::Canceled)));
        assert_eq!(delivered, 1);
    }

    #[test]
    fn search_surfaces_callback_failure() {
        let store = InMemoryLaptopStore::new();
        for _ in 0..3 {
            store.save(&sample::new_laptop()).unwrap();
        }
        let mut delivered = 0;

        let err = store
            .search(&ctx(), &everything(), &mut |_| {
                delivered += 1;
                Err(StoreError::Delivery("closed".to_string()))
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Delivery(_)));
        assert_eq!(delivered, 1);
    }

    #[test]
    fn thread_safety_concurrent_saves() {
        let store = Arc::new(InMemoryLaptopStore::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let s = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    s.save(&sample::new_laptop()).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 100);
    }

    #[test]
    fn thread_safety_racing_duplicate_saves() {
        let store = Arc::new(InMemoryLaptopStore::new());
        let laptop = sample::new_laptop();
        let mut handles = vec![];

        for _ in 0..8 {
            let s = Arc::clone(&store);
            let l = laptop.clone();
            handles.push(thread::spawn(move || s.save(&l).is_ok()));
        }

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.len(), 1);
    }
}

use std::collections::HashMap;
use std::hash::Hash;

use tracing::trace;

use crate::arena::{Arena, Handle};

struct Entry<K, V> {
    key: K,
    value: V,
    bytes: usize,
    /// Towards the most recently used end
    prev: Option<Handle>,
    /// Towards the least recently used end
    next: Option<Handle>,
}

/// Least-recently-used cache bounded by resident bytes rather than entry
/// count.
///
/// Entries live in an arena and form an intrusive doubly linked recency
/// list; the map only stores handles, so lookups, promotions and evictions
/// are all O(1). Every value leaving the cache through eviction, replacement
/// or `clear` is passed to the caller's release hook.
pub struct ThumbnailCache<K, V> {
    entries: Arena<Entry<K, V>>,
    index: HashMap<K, Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
    resident: usize,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> ThumbnailCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arena::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            resident: 0,
            capacity,
        }
    }

    /// Look up an entry and mark it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let handle = *self.index.get(key)?;
        self.unlink(handle);
        self.link_front(handle);
        self.entries.get(handle).map(|e| &e.value)
    }

    /// Look up an entry without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        let handle = self.index.get(key)?;
        self.entries.get(*handle).map(|e| &e.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert `value` charged at `bytes`, evicting least recently used
    /// entries until it fits.
    ///
    /// Returns false when the value alone exceeds the capacity; it is then
    /// released straight away and nothing else is evicted.
    pub fn put(&mut self, key: K, value: V, bytes: usize, mut on_release: impl FnMut(K, V)) -> bool {
        if let Some(old) = self.take(&key) {
            on_release(key.clone(), old);
        }

        if bytes > self.capacity {
            trace!(bytes, capacity = self.capacity, "entry larger than cache, rejected");
            on_release(key, value);
            return false;
        }

        while self.resident + bytes > self.capacity {
            let Some(victim) = self.tail else { break };
            if let Some(entry) = self.detach(victim) {
                trace!(bytes = entry.bytes, "evicting least recently used thumbnail");
                on_release(entry.key, entry.value);
            }
        }

        let entry = Entry {
            key: key.clone(),
            value,
            bytes,
            prev: None,
            next: None,
        };
        let handle = match self.entries.insert(entry) {
            Ok(handle) => handle,
            Err(entry) => {
                on_release(entry.key, entry.value);
                return false;
            }
        };
        self.link_front(handle);
        self.index.insert(key, handle);
        self.resident += bytes;
        true
    }

    /// Remove an entry, handing its value back to the caller
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.take(key)
    }

    /// Drop every entry through the release hook
    pub fn clear(&mut self, mut on_release: impl FnMut(K, V)) {
        while let Some(handle) = self.tail {
            if let Some(entry) = self.detach(handle) {
                on_release(entry.key, entry.value);
            }
        }
    }

    pub fn resident_bytes(&self) -> usize {
        self.resident
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Keys from most to least recently used
    pub fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let Some(entry) = self.entries.get(handle) else { break };
            keys.push(entry.key.clone());
            cursor = entry.next;
        }
        keys
    }

    fn take(&mut self, key: &K) -> Option<V> {
        let handle = *self.index.get(key)?;
        self.detach(handle).map(|entry| entry.value)
    }

    /// Unlink, drop from the index and the arena, and uncharge the bytes
    fn detach(&mut self, handle: Handle) -> Option<Entry<K, V>> {
        self.unlink(handle);
        let entry = self.entries.remove(handle)?;
        self.index.remove(&entry.key);
        self.resident -= entry.bytes;
        Some(entry)
    }

    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = match self.entries.get_mut(handle) {
            Some(entry) => (entry.prev.take(), entry.next.take()),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(entry) = self.entries.get_mut(p) {
                    entry.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(entry) = self.entries.get_mut(n) {
                    entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn link_front(&mut self, handle: Handle) {
        let old_head = self.head;
        if let Some(entry) = self.entries.get_mut(handle) {
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(h) = old_head
            && let Some(entry) = self.entries.get_mut(h)
        {
            entry.prev = Some(handle);
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_release(_: &str, _: u32) {
        panic!("nothing should be released");
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = ThumbnailCache::new(30);
        cache.put("a", 1, 10, |k, v| no_release(k, v));
        cache.put("b", 2, 10, |k, v| no_release(k, v));
        cache.put("c", 3, 10, |k, v| no_release(k, v));

        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.keys_by_recency(), vec!["a", "c", "b"]);

        let mut released = Vec::new();
        cache.put("d", 4, 10, |k, v| released.push((k, v)));
        assert_eq!(released, vec![("b", 2)]);
        assert_eq!(cache.resident_bytes(), 30);
    }

    #[test]
    fn test_evicts_only_what_is_needed() {
        let mut cache = ThumbnailCache::new(100);
        for (key, bytes) in [("a", 40), ("b", 30), ("c", 20)] {
            cache.put(key, bytes, bytes as usize, |k, v| no_release(k, v));
        }
        assert_eq!(cache.resident_bytes(), 90);

        let mut released = Vec::new();
        cache.put("d", 50, 50, |k, _| released.push(k));
        // 90 + 50 = 140: dropping "a" (40) gives 100, which fits
        assert_eq!(released, vec!["a"]);
        assert_eq!(cache.resident_bytes(), 100);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_oversized_entry_rejected() {
        let mut cache = ThumbnailCache::new(10);
        cache.put("a", 1, 5, |k, v| no_release(k, v));

        let mut released = Vec::new();
        let inserted = cache.put("huge", 2, 11, |k, v| released.push((k, v)));
        assert!(!inserted);
        assert_eq!(released, vec![("huge", 2)]);
        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.resident_bytes(), 5);
    }

    #[test]
    fn test_replace_releases_old_value() {
        let mut cache = ThumbnailCache::new(10);
        cache.put("a", 1, 4, |k, v| no_release(k, v));

        let mut released = Vec::new();
        cache.put("a", 2, 6, |k, v| released.push((k, v)));
        assert_eq!(released, vec![("a", 1)]);
        assert_eq!(cache.peek(&"a"), Some(&2));
        assert_eq!(cache.resident_bytes(), 6);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = ThumbnailCache::new(10);
        cache.put("a", 1, 3, |k, v| no_release(k, v));
        cache.put("b", 2, 3, |k, v| no_release(k, v));
        cache.put("c", 3, 3, |k, v| no_release(k, v));

        assert_eq!(cache.remove(&"b"), Some(2));
        assert_eq!(cache.remove(&"b"), None);
        assert_eq!(cache.resident_bytes(), 6);
        assert_eq!(cache.keys_by_recency(), vec!["c", "a"]);

        let mut released = Vec::new();
        cache.clear(|k, _| released.push(k));
        assert_eq!(released, vec!["a", "c"]);
        assert_eq!(cache.resident_bytes(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_resident_bytes_never_exceed_capacity() {
        let mut cache = ThumbnailCache::new(64);
        for i in 0..200u32 {
            let bytes = (i as usize * 7) % 40 + 1;
            cache.put(i, i, bytes, |_, _| {});
            assert!(cache.resident_bytes() <= cache.capacity());
        }
    }
}

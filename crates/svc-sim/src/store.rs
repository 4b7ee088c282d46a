//! Creation-ordered object stores.

use std::collections::BTreeSet;

use indexmap::IndexMap;

/// A record with a numeric id and a unique name.
pub trait Keyed {
    /// Numeric id, unique within the store.
    fn id(&self) -> u32;
    /// Name, unique within the store.
    fn name(&self) -> &str;
    /// Replace the name.
    fn set_name(&mut self, name: String);
}

/// The smallest non-negative integer not in `ids`.
pub fn find_unused_id<I: IntoIterator<Item = u32>>(ids: I) -> u32 {
    let used: BTreeSet<u32> = ids.into_iter().collect();
    let mut candidate = 0;
    for id in used {
        if id != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

/// Records keyed by name, iterated in creation order.
#[derive(Debug, Clone)]
pub struct Store<V> {
    items: IndexMap<String, V>,
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }
}

impl<V: Keyed> Store<V> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next record should take.
    pub fn next_id(&self) -> u32 {
        find_unused_id(self.items.values().map(Keyed::id))
    }

    /// Insert a record under its name, returning any record it replaced.
    pub fn insert(&mut self, value: V) -> Option<V> {
        self.items.insert(value.name().to_string(), value)
    }

    /// Whether a record with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Look up by exact name.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.items.get(name)
    }

    /// Look up by exact name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.items.get_mut(name)
    }

    /// Look up by numeric id.
    pub fn by_id(&self, id: u32) -> Option<&V> {
        self.items.values().find(|v| v.id() == id)
    }

    /// Resolve a name-or-id reference to the stored name.
    ///
    /// Names win over ids, so a record named `3` shadows the record whose
    /// id is 3.
    pub fn resolve(&self, key: &str) -> Option<String> {
        if self.items.contains_key(key) {
            return Some(key.to_string());
        }
        let id: u32 = key.parse().ok()?;
        self.by_id(id).map(|v| v.name().to_string())
    }

    /// Look up by name, then by id.
    pub fn find(&self, key: &str) -> Option<&V> {
        self.resolve(key).and_then(|name| self.items.get(&name))
    }

    /// Look up by name, then by id, mutably.
    pub fn find_mut(&mut self, key: &str) -> Option<&mut V> {
        let name = self.resolve(key)?;
        self.items.get_mut(&name)
    }

    /// Remove by name, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.items.shift_remove(name)
    }

    /// Rename a record in place. Returns `false` if `old` is absent or
    /// `new` is taken.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return self.items.contains_key(old);
        }
        if self.items.contains_key(new) {
            return false;
        }
        let Some((index, _, mut value)) = self.items.shift_remove_full(old) else {
            return false;
        };
        value.set_name(new.to_string());
        self.items.shift_insert(index, new.to_string(), value);
        true
    }

    /// Records in creation order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.items.values()
    }

    /// Records in creation order, mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.items.values_mut()
    }

    /// Stored names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    impl Keyed for Item {
        fn id(&self) -> u32 {
            self.id
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn set_name(&mut self, name: String) {
            self.name = name;
        }
    }

    fn add(store: &mut Store<Item>, name: &str) -> u32 {
        let id = store.next_id();
        store.insert(Item {
            id,
            name: name.to_string(),
        });
        id
    }

    #[test]
    fn ids_reuse_smallest_gap() {
        let mut store = Store::new();
        assert_eq!(add(&mut store, "a"), 0);
        assert_eq!(add(&mut store, "b"), 1);
        assert_eq!(add(&mut store, "c"), 2);
        store.remove("b");
        assert_eq!(add(&mut store, "d"), 1);
        assert_eq!(add(&mut store, "e"), 3);
    }

    #[test]
    fn find_by_name_then_id() {
        let mut store = Store::new();
        add(&mut store, "vol0");
        add(&mut store, "vol1");
        assert_eq!(store.find("vol1").map(|v| v.id), Some(1));
        assert_eq!(store.find("0").map(|v| v.name.as_str()), Some("vol0"));
        assert!(store.find("7").is_none());
        assert!(store.find("missing").is_none());
    }

    #[test]
    fn rename_keeps_position() {
        let mut store = Store::new();
        add(&mut store, "a");
        add(&mut store, "b");
        add(&mut store, "c");
        assert!(store.rename("b", "z"));
        assert_eq!(store.names(), ["a", "z", "c"]);
        assert_eq!(store.get("z").map(|v| v.name.as_str()), Some("z"));
        assert!(!store.rename("a", "c"));
        assert!(!store.rename("missing", "q"));
    }

    #[test]
    fn remove_keeps_order() {
        let mut store = Store::new();
        for name in ["a", "b", "c", "d"] {
            add(&mut store, name);
        }
        store.remove("b");
        assert_eq!(store.names(), ["a", "c", "d"]);
    }

    #[test]
    fn find_unused_id_cases() {
        assert_eq!(find_unused_id([]), 0);
        assert_eq!(find_unused_id([1, 2]), 0);
        assert_eq!(find_unused_id([0, 1, 3]), 2);
        assert_eq!(find_unused_id([2, 0, 1]), 3);
    }

    proptest! {
        #[test]
        fn prop_next_id_is_smallest_free(ops in prop::collection::vec(any::<(bool, u8)>(), 1..64)) {
            let mut store = Store::new();
            let mut counter = 0u32;
            for (create, pick) in ops {
                if create || store.is_empty() {
                    let expected = (0..).find(|i| store.by_id(*i).is_none()).unwrap_or_default();
                    let id = add(&mut store, &format!("obj{counter}"));
                    counter += 1;
                    prop_assert_eq!(id, expected);
                } else {
                    let names = store.names();
                    let victim = &names[usize::from(pick) % names.len()];
                    store.remove(victim);
                }
            }
            let mut ids: Vec<u32> = store.values().map(|v| v.id).collect();
            let before = ids.len();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), before);
        }
    }
}

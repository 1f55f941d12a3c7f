use core::hash::Hash;
use im::{HashMap, Vector};

pub trait OrDefault<K, V> {
    fn get_or_default(&self, item: &K) -> V;
}

impl<K, V> OrDefault<K, V> for HashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Default + Clone,
{
    fn get_or_default(&self, item: &K) -> V {
        self.get(item).cloned().unwrap_or_default()
    }
}

pub trait Upsert<K, T> {
    /// Replaces the element at the index recorded for `key`, or appends it
    /// and records its index. Returns the new collections; `self` is left
    /// untouched.
    fn upsert(&self, key: K, item: T) -> Self;
}

impl<K, T> Upsert<K, T> for (Vector<T>, HashMap<K, usize>)
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn upsert(&self, key: K, item: T) -> Self {
        let (items, index) = self;
        match index.get(&key) {
            Some(&idx) => (items.update(idx, item), index.clone()),
            None => {
                let mut appended = items.clone();
                appended.push_back(item);
                (appended, index.update(key, items.len()))
            }
        }
    }
}

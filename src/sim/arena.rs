/// Index-based storage for world objects.
///
/// Slots are reused after removal; every reuse bumps the slot's
/// generation so a stale [`Key`] never reaches the new occupant.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Key {
    index: u32,
    generation: u32,
}

#[derive(Clone, Debug)]
enum Slot<T> {
    Occupied { value: T, generation: u32 },
    Vacant { next_free: Option<usize>, generation: u32 },
}

#[derive(Clone, Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    len: usize,
    free_head: Option<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub const fn new() -> Self {
        Arena { slots: Vec::new(), len: 0, free_head: None }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn insert(&mut self, value: T) -> Key {
        self.len += 1;
        if let Some(index) = self.free_head {
            if let Slot::Vacant { next_free, generation } = self.slots[index] {
                let generation = generation.wrapping_add(1);
                self.free_head = next_free;
                self.slots[index] = Slot::Occupied { value, generation };
                return Key { index: index as u32, generation };
            }
        }
        let index = self.slots.len();
        self.slots.push(Slot::Occupied { value, generation: 0 });
        Key { index: index as u32, generation: 0 }
    }

    pub fn remove(&mut self, key: Key) -> Option<T> {
        let index = key.index as usize;
        match self.slots.get(index) {
            Some(Slot::Occupied { generation, .. }) if *generation == key.generation => {}
            _ => return None,
        }
        let vacant = Slot::Vacant { next_free: self.free_head, generation: key.generation };
        self.free_head = Some(index);
        self.len -= 1;
        match std::mem::replace(&mut self.slots[index], vacant) {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: Key) -> Option<&T> {
        match self.slots.get(key.index as usize) {
            Some(Slot::Occupied { value, generation }) if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.slots.get_mut(key.index as usize) {
            Some(Slot::Occupied { value, generation }) if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied { value, generation } =>
                Some((Key { index: i as u32, generation: *generation }, value)),
            Slot::Vacant { .. } => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Key, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied { value, generation } =>
                Some((Key { index: i as u32, generation: *generation }, value)),
            Slot::Vacant { .. } => None,
        })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.iter().map(|(k, _)| k).collect()
    }

    /// Remove every element for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(Key, &T) -> bool) {
        let doomed: Vec<Key> = self.iter().filter(|(k, v)| !keep(*k, v)).map(|(k, _)| k).collect();
        for key in doomed {
            self.remove(key);
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
        self.free_head = None;
    }
}

impl<T> FromIterator<T> for Arena<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut arena = Arena::new();
        for value in iter {
            arena.insert(value);
        }
        arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut a = Arena::new();
        let k1 = a.insert("one");
        let k2 = a.insert("two");
        assert_eq!(a.len(), 2);
        assert_eq!(a.get(k1), Some(&"one"));
        assert_eq!(a.remove(k1), Some("one"));
        assert_eq!(a.get(k1), None);
        assert_eq!(a.remove(k1), None);
        assert_eq!(a.get(k2), Some(&"two"));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn stale_key_misses_reused_slot() {
        let mut a = Arena::new();
        let old = a.insert(1);
        a.remove(old);
        let new = a.insert(2);
        assert_ne!(old, new);
        assert!(!a.contains(old));
        assert_eq!(a.get(new), Some(&2));
    }

    #[test]
    fn iteration_skips_holes_in_index_order() {
        let mut a: Arena<i32> = (0..5).collect();
        let keys = a.keys();
        a.remove(keys[1]);
        a.remove(keys[3]);
        assert_eq!(a.values().copied().collect::<Vec<_>>(), vec![0, 2, 4]);
        for v in a.values_mut() { *v *= 10; }
        assert_eq!(a.values().copied().collect::<Vec<_>>(), vec![0, 20, 40]);
    }

    #[test]
    fn retain_drops_rejected() {
        let mut a: Arena<i32> = (0..6).collect();
        a.retain(|_, v| v % 2 == 0);
        assert_eq!(a.len(), 3);
        assert_eq!(a.values().copied().collect::<Vec<_>>(), vec![0, 2, 4]);
    }
}

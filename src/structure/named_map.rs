use std::{fmt, marker::PhantomData};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// A map of names to values preserving insertion order.
///
/// Variables and coordinates are kept in their declared order, which is the order they are iterated and read in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for NamedMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> NamedMap<T> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert `value` under `name`.
    ///
    /// An existing entry with the same name is replaced in place and its previous value returned.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        let name = name.into();
        if let Some(slot) = self.get_mut(&name) {
            Some(std::mem::replace(slot, value))
        } else {
            self.entries.push((name, value));
            None
        }
    }

    /// Return the value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// Return a mutable reference to the value for `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// Returns true if the map has an entry for `name`.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove and return the value for `name`, preserving the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let position = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(position).1)
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &T)> + ExactSizeIterator {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Iterate over the names in order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Iterate over the values in order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Map each value, keeping the names and order.
    pub fn map<U>(self, mut f: impl FnMut(&str, T) -> U) -> NamedMap<U> {
        NamedMap {
            entries: self
                .entries
                .into_iter()
                .map(|(key, value)| {
                    let value = f(&key, value);
                    (key, value)
                })
                .collect(),
        }
    }

    /// Map each value with a fallible function, keeping the names and order.
    ///
    /// # Errors
    /// Returns the first error returned by `f`.
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(&str, T) -> Result<U, E>,
    ) -> Result<NamedMap<U>, E> {
        let entries = self
            .entries
            .into_iter()
            .map(|(key, value)| f(&key, value).map(|value| (key, value)))
            .collect::<Result<_, _>>()?;
        Ok(NamedMap { entries })
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for NamedMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl<K: Into<String>, T> Extend<(K, T)> for NamedMap<T> {
    fn extend<I: IntoIterator<Item = (K, T)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<T> IntoIterator for NamedMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T: Serialize> Serialize for NamedMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct NamedMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for NamedMapVisitor<T> {
    type Value = NamedMap<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = NamedMap::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            if map.contains_key(&key) {
                return Err(serde::de::Error::custom(format!("duplicate name {key:?}")));
            }
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for NamedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(NamedMapVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_map_order() {
        let mut map: NamedMap<u32> = [("z", 1), ("a", 2)].into_iter().collect();
        assert_eq!(map.insert("m", 3), None);
        assert_eq!(map.insert("z", 4), Some(1));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(map.get("z"), Some(&4));
        assert_eq!(map.remove("a"), Some(2));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "m"]);
        assert!(!map.contains_key("a"));
    }

    #[test]
    fn named_map_serde() {
        let map: NamedMap<u32> = serde_json::from_str(r#"{"y": 1, "x": 2}"#).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["y", "x"]);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"y":1,"x":2}"#);
        assert!(serde_json::from_str::<NamedMap<u32>>(r#"{"y": 1, "y": 2}"#).is_err());
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named dimension lengths of one file, in the order they were read or added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionTable {
    entries: IndexMap<String, usize>,
}

impl DimensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a dimension. An update keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, length: usize) -> Option<usize> {
        self.entries.insert(name.into(), length)
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<usize> {
        self.entries.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.entries.iter().map(|(name, length)| (name.as_str(), *length))
    }

    /// Copy every entry of `other` into this table; `other` wins on conflicts.
    pub fn merge(&mut self, other: &DimensionTable) {
        for (name, length) in other.iter() {
            self.insert(name, length);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for DimensionTable {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        let mut table = DimensionTable::new();
        for (name, length) in iter {
            table.insert(name, length);
        }
        table
    }
}

//! Path parameters bound by a route match.

/// Named path parameters for one request, in pattern order.
///
/// For a route `/users/:name/posts/:id` matched against `/users/ann/posts/7`
/// the bag holds `name = "ann"` and `id = "7"`. Values are always the raw
/// path segment; nothing is decoded or coerced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `value`. A key that is already present keeps its
    /// position and takes the new value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_in_place() {
        let mut params = Params::new();
        params.set("a", "1");
        params.set("b", "2");
        params.set("a", "3");

        assert_eq!(params.get("a"), Some("3"));
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn remove_and_contains() {
        let mut params = Params::new();
        params.set("name", "ann");
        assert!(params.contains("name"));
        assert_eq!(params.remove("name").as_deref(), Some("ann"));
        assert!(!params.contains("name"));
        assert!(params.is_empty());
        assert_eq!(params.remove("name"), None);
    }
}

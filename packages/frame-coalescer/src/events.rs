use std::fmt::{self, Display};

/// Split a whitespace-separated list of event names into tokens.
pub fn tokens(events: &str) -> impl Iterator<Item = &str> {
    events.split_whitespace()
}

/// An ordered set of event names.
///
/// Insertion order is preserved and a name is stored at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventNames {
    names: Vec<String>,
}

impl EventNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated list, dropping repeats.
    pub fn parse(events: &str) -> Self {
        let mut names = Self::new();
        names.extend(events);
        names
    }

    /// Merge every token of `events` into the set, keeping the first position of each name.
    pub fn extend(&mut self, events: &str) {
        for token in tokens(events) {
            if !self.contains(token) {
                self.names.push(token.to_string());
            }
        }
    }

    /// Remove every token of `events` from the set. Names that aren't present are ignored.
    pub fn remove(&mut self, events: &str) {
        for token in tokens(events) {
            if let Some(idx) = self.names.iter().position(|name| name == token) {
                self.names.remove(idx);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Display for EventNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, name) in self.names.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

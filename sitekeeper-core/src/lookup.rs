//! Tagged result of a store lookup.
//!
//! Lookups never fail with an error: they report whether the resource is
//! usable, and if not, why.

/// Outcome of looking up a site or theme on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The resource exists and is usable.
    Found(T),
    /// Nothing exists under that name.
    NotFound,
    /// Something exists but cannot be used (bad config, wrong file type).
    Corrupt(String),
    /// The filesystem refused to tell us (permissions, I/O failure).
    Unreadable(String),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Collapse to present/absent, dropping the reason for absence.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Corrupt(detail) => Lookup::Corrupt(detail),
            Lookup::Unreadable(detail) => Lookup::Unreadable(detail),
        }
    }

    /// Human-readable reason when the lookup did not find a usable resource.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Lookup::Corrupt(detail) | Lookup::Unreadable(detail) => Some(detail),
            Lookup::Found(_) | Lookup::NotFound => None,
        }
    }
}

impl<T> From<Lookup<T>> for Option<T> {
    fn from(lookup: Lookup<T>) -> Self {
        lookup.found()
    }
}

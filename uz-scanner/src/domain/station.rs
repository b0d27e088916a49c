//! Station record.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A station as returned by the UZ station search.
///
/// Identity is the numeric station id; the title is a human-readable
/// name in whatever language the site was queried in. Two stations with
/// the same id but different titles compare equal.
///
/// # Examples
///
/// ```
/// use uz_scanner::domain::Station;
///
/// let a = Station::new(2200001, "Kyiv");
/// let b = Station::new(2200001, "Київ");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Eq)]
pub struct Station {
    /// Numeric station identifier used in all wire payloads.
    pub id: i64,
    /// Display name of the station.
    pub title: String,
}

impl Station {
    /// Create a station record.
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl PartialEq for Station {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Station {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_id_only() {
        let a = Station::new(2200001, "Kyiv");
        let b = Station::new(2200001, "Kyiv-Pasazhyrsky");
        let c = Station::new(2218000, "Lviv");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hash_consistent_with_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Station::new(2200001, "Kyiv"));
        assert!(set.contains(&Station::new(2200001, "Київ")));
        assert!(!set.contains(&Station::new(2218000, "Lviv")));
    }

    #[test]
    fn display_is_title() {
        let station = Station::new(2218000, "Lviv");
        assert_eq!(station.to_string(), "Lviv");
    }
}

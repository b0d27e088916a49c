//! Coach classes and individual coaches.

use std::collections::BTreeMap;
use std::fmt;

/// A class of coach offered on a train (suite, coupe, berth, seating...).
///
/// The letter is the site's single- or two-character class code (`Л`,
/// `К`, `П`, `С1`, ...) and is what users filter scans by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachType {
    /// Class code letter, e.g. `К` for coupe.
    pub letter: String,
    /// Free seats remaining in this class across the train.
    pub capacity: u32,
    /// Human-readable class name.
    pub title: String,
}

impl CoachType {
    /// Create a coach type record.
    pub fn new(letter: impl Into<String>, capacity: u32, title: impl Into<String>) -> Self {
        Self {
            letter: letter.into(),
            capacity,
            title: title.into(),
        }
    }
}

impl fmt::Display for CoachType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.letter, self.capacity, self.title)
    }
}

/// One physical coach of a train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coach {
    /// Whether bonus points may pay for this coach.
    pub allow_bonus: bool,
    /// Coach number within the train.
    pub number: u32,
    /// Coach class code, required again when listing and booking seats.
    pub class: String,
    /// Numeric coach type id.
    pub type_id: u32,
    /// Whether bedding is included.
    pub has_bedding: bool,
    /// Free seats in this coach.
    pub seat_count: u32,
    /// Price per fare class, in kopecks.
    pub prices: BTreeMap<String, u64>,
    /// Reservation surcharge, in kopecks.
    pub reserve_price: u64,
    /// Service codes available in the coach.
    pub services: Vec<String>,
}

impl fmt::Display for Coach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coach {}", self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coach() -> Coach {
        Coach {
            allow_bonus: false,
            number: 8,
            class: "Б".to_string(),
            type_id: 3,
            has_bedding: true,
            seat_count: 10,
            prices: BTreeMap::from([("А".to_string(), 33850)]),
            reserve_price: 1700,
            services: vec!["Ч".to_string(), "Ш".to_string()],
        }
    }

    #[test]
    fn coach_type_display() {
        let ct = CoachType::new("К", 51, "Coupe / coach with compartments");
        assert_eq!(ct.to_string(), "К: 51 (Coupe / coach with compartments)");
    }

    #[test]
    fn coach_display() {
        assert_eq!(coach().to_string(), "Coach 8");
    }

    #[test]
    fn coach_equality_covers_prices() {
        let a = coach();
        let mut b = coach();
        assert_eq!(a, b);
        b.prices.insert("Б".to_string(), 40000);
        assert_ne!(a, b);
    }
}

//! Train record.

use std::fmt;

use super::coach::CoachType;
use super::station::Station;
use super::time::UzTimestamp;

/// A train on a specific date and route, as returned by the train search.
///
/// Carries everything later pipeline steps need: the stations (with ids),
/// the departure epoch (which doubles as the date key in coach and seat
/// payloads), the rolling-stock model, and the coach classes on offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Train {
    /// Train category reported by the site.
    pub category: u32,
    /// Rolling-stock model, echoed back in the coach listing payload.
    pub model: u32,
    /// Train number, e.g. `741К`.
    pub number: String,
    /// Journey duration as rendered by the site, e.g. `5:38`.
    pub travel_time: String,
    /// Coach classes available on this train, in site order.
    pub coach_types: Vec<CoachType>,
    /// Boarding station.
    pub source_station: Station,
    /// Alighting station.
    pub destination_station: Station,
    /// Departure instant.
    pub departure: UzTimestamp,
    /// Arrival instant.
    pub arrival: UzTimestamp,
}

impl Train {
    /// Find a coach type on this train by its class letter.
    pub fn find_coach_type(&self, letter: &str) -> Option<&CoachType> {
        self.coach_types.iter().find(|ct| ct.letter == letter)
    }

    /// Multi-line summary of the train and its coach classes.
    pub fn info(&self) -> String {
        let mut parts = vec![format!(
            "Train: {}\nDeparture time: {}\nTravel time: {}\n~~~~~~~~~~",
            self.number, self.departure, self.travel_time
        )];
        parts.extend(self.coach_types.iter().map(ToString::to_string));
        parts.join("\n")
    }
}

impl fmt::Display for Train {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} - {}, {}",
            self.number, self.source_station, self.destination_station, self.departure
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train() -> Train {
        Train {
            category: 0,
            model: 0,
            number: "091К".to_string(),
            travel_time: "7:25".to_string(),
            coach_types: vec![
                CoachType::new("Л", 18, "Suite / first-class sleeper"),
                CoachType::new("К", 51, "Coupe / coach with compartments"),
            ],
            source_station: Station::new(2200001, "Kyiv-Pasazhyrsky"),
            destination_station: Station::new(2218000, "Lviv"),
            departure: UzTimestamp::new(1466451660, "2016-06-20 22:41:00"),
            arrival: UzTimestamp::new(1466478360, "2016-06-21 06:06:00"),
        }
    }

    #[test]
    fn find_coach_type_by_letter() {
        let train = train();
        assert_eq!(train.find_coach_type("К").unwrap().capacity, 51);
        assert!(train.find_coach_type("П").is_none());
    }

    #[test]
    fn display_summarises_route() {
        assert_eq!(
            train().to_string(),
            "091К: Kyiv-Pasazhyrsky - Lviv, 2016-06-20 22:41:00"
        );
    }

    #[test]
    fn info_lists_coach_types() {
        let info = train().info();
        assert!(info.starts_with("Train: 091К\n"));
        assert!(info.contains("Л: 18 (Suite / first-class sleeper)"));
        assert!(info.contains("К: 51 (Coupe / coach with compartments)"));
    }
}

//! Conversion between wire DTOs and domain types.
//!
//! Conversions run in both directions because the round-trip invariant
//! (`to_wire(from_wire(record)) == record`) is part of the contract:
//! the same records the site sends are handed onwards to callers.

use crate::domain::{Coach, CoachType, Station, Train, UzTimestamp};

use super::types::{CoachDto, CoachTypeDto, StationDto, StationPointDto, TrainDto};

impl From<StationDto> for Station {
    fn from(dto: StationDto) -> Self {
        Station {
            id: dto.station_id,
            title: dto.title,
        }
    }
}

impl From<Station> for StationDto {
    fn from(station: Station) -> Self {
        StationDto {
            station_id: station.id,
            title: station.title,
        }
    }
}

impl From<CoachTypeDto> for CoachType {
    fn from(dto: CoachTypeDto) -> Self {
        CoachType {
            letter: dto.letter,
            capacity: dto.places,
            title: dto.title,
        }
    }
}

impl From<CoachType> for CoachTypeDto {
    fn from(ct: CoachType) -> Self {
        CoachTypeDto {
            letter: ct.letter,
            places: ct.capacity,
            title: ct.title,
        }
    }
}

impl From<CoachDto> for Coach {
    fn from(dto: CoachDto) -> Self {
        Coach {
            allow_bonus: dto.allow_bonus,
            number: dto.num,
            class: dto.coach_class,
            type_id: dto.coach_type_id,
            has_bedding: dto.has_bedding,
            seat_count: dto.places_cnt,
            prices: dto.prices,
            reserve_price: dto.reserve_price,
            services: dto.services,
        }
    }
}

impl From<Coach> for CoachDto {
    fn from(coach: Coach) -> Self {
        CoachDto {
            allow_bonus: coach.allow_bonus,
            coach_class: coach.class,
            coach_type_id: coach.type_id,
            has_bedding: coach.has_bedding,
            num: coach.number,
            places_cnt: coach.seat_count,
            prices: coach.prices,
            reserve_price: coach.reserve_price,
            services: coach.services,
        }
    }
}

impl From<TrainDto> for Train {
    fn from(dto: TrainDto) -> Self {
        Train {
            category: dto.category,
            model: dto.model,
            number: dto.num,
            travel_time: dto.travel_time,
            coach_types: dto.types.into_iter().map(CoachType::from).collect(),
            source_station: Station::new(dto.from_point.station_id, dto.from_point.station),
            destination_station: Station::new(dto.till_point.station_id, dto.till_point.station),
            departure: UzTimestamp::new(dto.from_point.date, dto.from_point.src_date),
            arrival: UzTimestamp::new(dto.till_point.date, dto.till_point.src_date),
        }
    }
}

impl From<Train> for TrainDto {
    fn from(train: Train) -> Self {
        TrainDto {
            category: train.category,
            model: train.model,
            num: train.number,
            travel_time: train.travel_time,
            types: train.coach_types.into_iter().map(CoachTypeDto::from).collect(),
            from_point: station_point(train.source_station, train.departure),
            till_point: station_point(train.destination_station, train.arrival),
        }
    }
}

fn station_point(station: Station, time: UzTimestamp) -> StationPointDto {
    StationPointDto {
        date: time.epoch,
        src_date: time.display,
        station: station.title,
        station_id: station.id,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_station_point() -> impl Strategy<Value = StationPointDto> {
        (
            any::<i64>(),
            "[ -~]{0,20}",
            "[A-Za-zА-Яа-я\\-' ]{1,20}",
            any::<i64>(),
        )
            .prop_map(|(date, src_date, station, station_id)| StationPointDto {
                date,
                src_date,
                station,
                station_id,
            })
    }

    fn arb_coach_type() -> impl Strategy<Value = CoachTypeDto> {
        ("[А-ЯA-Z][0-9]?", any::<u32>(), "[ -~]{0,20}").prop_map(|(letter, places, title)| {
            CoachTypeDto {
                letter,
                places,
                title,
            }
        })
    }

    fn arb_train() -> impl Strategy<Value = TrainDto> {
        (
            any::<u32>(),
            any::<u32>(),
            "[0-9]{3}[А-Я]",
            "[0-9]{1,2}:[0-5][0-9]",
            prop::collection::vec(arb_coach_type(), 0..4),
            arb_station_point(),
            arb_station_point(),
        )
            .prop_map(
                |(category, model, num, travel_time, types, from_point, till_point)| TrainDto {
                    category,
                    model,
                    num,
                    travel_time,
                    types,
                    from_point,
                    till_point,
                },
            )
    }

    fn arb_coach() -> impl Strategy<Value = CoachDto> {
        (
            any::<bool>(),
            "[0-9А-Я]",
            any::<u32>(),
            any::<bool>(),
            any::<u32>(),
            any::<u32>(),
            prop::collection::btree_map("[А-Я]", any::<u64>(), 0..3),
            any::<u64>(),
            prop::collection::vec("[А-Я]", 0..3),
        )
            .prop_map(
                |(
                    allow_bonus,
                    coach_class,
                    coach_type_id,
                    has_bedding,
                    num,
                    places_cnt,
                    prices,
                    reserve_price,
                    services,
                )| CoachDto {
                    allow_bonus,
                    coach_class,
                    coach_type_id,
                    has_bedding,
                    num,
                    places_cnt,
                    prices,
                    reserve_price,
                    services,
                },
            )
    }

    proptest! {
        /// Decoding a wire train then re-encoding reproduces it exactly.
        #[test]
        fn train_wire_round_trip(dto in arb_train()) {
            prop_assert_eq!(TrainDto::from(Train::from(dto.clone())), dto);
        }

        /// Same for coaches.
        #[test]
        fn coach_wire_round_trip(dto in arb_coach()) {
            prop_assert_eq!(CoachDto::from(Coach::from(dto.clone())), dto);
        }
    }
}

//! Coordinate Resolver
//!
//! Owns the current candidate coordinates and the decision procedure
//! that picks exactly one pair to act on. Two candidate slots exist,
//! keyed by source tag; recording into an occupied slot replaces the
//! prior value. Resolution is a pure read and never auto-picks between
//! two live candidates: ambiguity is always escalated to the user.

use chrono::{DateTime, Utc};

use crate::domain::{CandidateSource, Choice, Coordinate};

/// Sensor fix with the moment it was taken
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorFix {
    pub coordinate: Coordinate,
    pub taken_at: DateTime<Utc>,
}

/// Outcome of [`ResolutionState::resolve`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResolutionOutcome {
    /// No candidates: the user has to act before a save can proceed
    NeedsInput,
    /// Exactly one candidate, usable as-is
    Resolved(Coordinate),
    /// Both candidates live: the user must pick one
    NeedsDisambiguation {
        sensor: Coordinate,
        map: Coordinate,
    },
}

/// Session-scoped candidate state.
///
/// Created empty at session start; populated as the user acts; read
/// but never mutated by a save. Candidates persist across saves until
/// replaced, and are discarded with the session.
#[derive(Debug, Default)]
pub struct ResolutionState {
    sensor: Option<SensorFix>,
    map: Option<Coordinate>,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate, replacing any prior candidate with the same
    /// source tag.
    pub fn record(&mut self, candidate: CandidateSource) {
        match candidate {
            CandidateSource::Sensor {
                coordinate,
                taken_at,
            } => {
                self.sensor = Some(SensorFix {
                    coordinate,
                    taken_at,
                });
                log::debug!("sensor candidate now {coordinate}");
            }
            CandidateSource::MapSelection { coordinate } => {
                self.map = Some(coordinate);
                log::debug!("map candidate now {coordinate}");
            }
        }
    }

    pub fn record_sensor_reading(&mut self, coordinate: Coordinate) {
        self.record(CandidateSource::Sensor {
            coordinate,
            taken_at: Utc::now(),
        });
    }

    pub fn record_map_selection(&mut self, coordinate: Coordinate) {
        self.record(CandidateSource::MapSelection { coordinate });
    }

    pub fn sensor_fix(&self) -> Option<SensorFix> {
        self.sensor
    }

    pub fn map_selection(&self) -> Option<Coordinate> {
        self.map
    }

    /// Decide which coordinate a save should act on. Pure read.
    pub fn resolve(&self) -> ResolutionOutcome {
        match (self.sensor, self.map) {
            (None, None) => ResolutionOutcome::NeedsInput,
            (Some(fix), None) => ResolutionOutcome::Resolved(fix.coordinate),
            (None, Some(map)) => ResolutionOutcome::Resolved(map),
            (Some(fix), Some(map)) => ResolutionOutcome::NeedsDisambiguation {
                sensor: fix.coordinate,
                map,
            },
        }
    }

    /// Apply an explicit disambiguation pick. Returns `None` when the
    /// chosen candidate is not live (the dialog raced a state change).
    pub fn choose(&self, choice: Choice) -> Option<Coordinate> {
        match choice {
            Choice::SensorFix => self.sensor.map(|fix| fix.coordinate),
            Choice::MapSelection => self.map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn empty_state_needs_input() {
        let state = ResolutionState::new();
        assert_eq!(state.resolve(), ResolutionOutcome::NeedsInput);
    }

    #[test]
    fn single_candidate_resolves_unchanged() {
        let mut state = ResolutionState::new();
        state.record_sensor_reading(coord(12.5, -7.25));
        assert_eq!(
            state.resolve(),
            ResolutionOutcome::Resolved(coord(12.5, -7.25))
        );

        let mut state = ResolutionState::new();
        state.record_map_selection(coord(-33.0, 151.0));
        assert_eq!(
            state.resolve(),
            ResolutionOutcome::Resolved(coord(-33.0, 151.0))
        );
    }

    #[test]
    fn two_candidates_always_escalate() {
        let mut state = ResolutionState::new();
        state.record_sensor_reading(coord(1.0, 1.0));
        state.record_map_selection(coord(2.0, 2.0));
        assert_eq!(
            state.resolve(),
            ResolutionOutcome::NeedsDisambiguation {
                sensor: coord(1.0, 1.0),
                map: coord(2.0, 2.0),
            }
        );
    }

    #[test]
    fn second_sensor_reading_replaces_the_first() {
        let mut state = ResolutionState::new();
        state.record_sensor_reading(coord(1.0, 1.0));
        state.record_sensor_reading(coord(3.0, 4.0));
        assert_eq!(state.sensor_fix().unwrap().coordinate, coord(3.0, 4.0));
        assert_eq!(state.map_selection(), None);
        // Still a single candidate, not two
        assert_eq!(state.resolve(), ResolutionOutcome::Resolved(coord(3.0, 4.0)));
    }

    #[test]
    fn second_map_selection_replaces_the_first() {
        let mut state = ResolutionState::new();
        state.record_map_selection(coord(5.0, 6.0));
        state.record_map_selection(coord(7.0, 8.0));
        assert_eq!(state.map_selection(), Some(coord(7.0, 8.0)));
        assert_eq!(state.resolve(), ResolutionOutcome::Resolved(coord(7.0, 8.0)));
    }

    #[test]
    fn resolve_does_not_mutate() {
        let mut state = ResolutionState::new();
        state.record_sensor_reading(coord(1.0, 1.0));
        state.record_map_selection(coord(2.0, 2.0));
        let before = state.resolve();
        for _ in 0..3 {
            assert_eq!(state.resolve(), before);
        }
        assert!(state.sensor_fix().is_some());
        assert!(state.map_selection().is_some());
    }

    #[test]
    fn choose_picks_the_named_candidate() {
        let mut state = ResolutionState::new();
        state.record_sensor_reading(coord(1.0, 1.0));
        state.record_map_selection(coord(2.0, 2.0));
        assert_eq!(state.choose(Choice::SensorFix), Some(coord(1.0, 1.0)));
        assert_eq!(state.choose(Choice::MapSelection), Some(coord(2.0, 2.0)));

        let empty = ResolutionState::new();
        assert_eq!(empty.choose(Choice::SensorFix), None);
    }
}

//! Route planning state: an ordered list of waypoints toward a destination,
//! consumed as the traveller's reported position comes within range.

use serde::{Deserialize, Serialize};

use super::{ScreenId, ScreenState};
use crate::validation::{self, FieldErrors};
use crate::{CoordinateError, LatLon, UnixTimeMs, ValidatedCoordinate, WAYPOINT_ARRIVAL_RADIUS_M};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    #[default]
    Walking,
    Cycling,
    Driving,
    Transit,
}

impl TravelMode {
    /// Average speed used for ETA estimates.
    #[must_use]
    pub const fn speed_mps(self) -> f64 {
        match self {
            Self::Walking => 1.4,
            Self::Cycling => 4.5,
            Self::Driving => 13.9,
            Self::Transit => 8.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub name: String,
    pub position: LatLon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub mode: TravelMode,
    pub destination: Option<Waypoint>,
    pub waypoints: Vec<Waypoint>,
    pub current_position: Option<LatLon>,
    pub avoid_tolls: bool,
    pub updated_at: UnixTimeMs,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            mode: TravelMode::default(),
            destination: None,
            waypoints: Vec::new(),
            current_position: None,
            avoid_tolls: false,
            updated_at: UnixTimeMs::now(),
        }
    }
}

impl NavigationState {
    /// Remaining stops in travel order, ending at the destination.
    fn route(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter().chain(self.destination.iter())
    }

    /// Distance along the remaining route from the current position, `None`
    /// until both a position and a destination are known.
    pub fn remaining_distance_m(&self) -> Result<Option<f64>, CoordinateError> {
        let (Some(position), Some(_)) = (self.current_position, &self.destination) else {
            return Ok(None);
        };

        let mut from: ValidatedCoordinate = position.try_into()?;
        let mut total = 0.0;
        for stop in self.route() {
            let to = stop.position.validate()?;
            total += from.distance_to(to);
            from = to;
        }
        Ok(Some(total))
    }

    pub fn eta_minutes(&self) -> Result<Option<u32>, CoordinateError> {
        Ok(self.remaining_distance_m()?.map(|meters| {
            let minutes = (meters / self.mode.speed_mps() / 60.0).ceil();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let minutes = minutes.clamp(0.0, f64::from(u32::MAX)) as u32;
            minutes
        }))
    }

    /// Records a new position and drops the next waypoint if it is within
    /// arrival range. Returns the name of the waypoint reached, if any.
    pub fn advance_if_arrived(&mut self, position: LatLon) -> Result<Option<String>, CoordinateError> {
        let here = position.validate()?;
        self.current_position = Some(position);

        let Some(next) = self.waypoints.first() else {
            return Ok(None);
        };
        if here.distance_to(next.position.validate()?) <= WAYPOINT_ARRIVAL_RADIUS_M {
            return Ok(Some(self.waypoints.remove(0).name));
        }
        Ok(None)
    }

    #[must_use]
    pub fn has_arrived(&self) -> bool {
        match (self.current_position, &self.destination) {
            (Some(here), Some(dest)) if self.waypoints.is_empty() => {
                match (here.validate(), dest.position.validate()) {
                    (Ok(a), Ok(b)) => a.distance_to(b) <= WAYPOINT_ARRIVAL_RADIUS_M,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl ScreenState for NavigationState {
    const SCREEN: ScreenId = ScreenId::Navigation;

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match &self.destination {
            None => errors.add("destination", "Choose a destination."),
            Some(dest) => {
                validation::required(&mut errors, "destination.name", &dest.name);
                if let Err(e) = dest.position.validate() {
                    errors.add("destination.position", e.to_string());
                }
            }
        }
        for (i, stop) in self.waypoints.iter().enumerate() {
            if let Err(e) = stop.position.validate() {
                errors.add(format!("waypoints.{i}.position"), e.to_string());
            }
        }
        errors
    }
}

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoofType {
    Outdoor,
    Dome,
    Retractable,
}

impl RoofType {
    /// Fixed domes get no forecast lookup; retractable roofs follow the
    /// outdoor forecast.
    pub fn is_dome(self) -> bool {
        self == RoofType::Dome
    }

    pub fn label(self) -> &'static str {
        match self {
            RoofType::Outdoor => "Outdoor",
            RoofType::Dome => "Dome",
            RoofType::Retractable => "Retractable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldSurface {
    Grass,
    Turf,
    Hybrid,
}

impl FieldSurface {
    pub fn label(self) -> &'static str {
        match self {
            FieldSurface::Grass => "Grass",
            FieldSurface::Turf => "Turf",
            FieldSurface::Hybrid => "Hybrid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stadium {
    pub team: &'static str,
    pub name: &'static str,
    pub city: &'static str,
    pub state: &'static str,
    pub lat: f64,
    pub long: f64,
    pub roof: RoofType,
    pub field: FieldSurface,
}

impl Stadium {
    pub fn city_label(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

#[allow(clippy::too_many_arguments)]
const fn venue(
    team: &'static str,
    name: &'static str,
    city: &'static str,
    state: &'static str,
    lat: f64,
    long: f64,
    roof: RoofType,
    field: FieldSurface,
) -> Stadium {
    Stadium {
        team,
        name,
        city,
        state,
        lat,
        long,
        roof,
        field,
    }
}

use FieldSurface::{Grass, Hybrid, Turf};
use RoofType::{Dome, Outdoor, Retractable};

pub static STADIUMS: [Stadium; 32] = [
    venue("ARI", "State Farm Stadium", "Glendale", "AZ", 33.5276, -112.2626, Retractable, Grass),
    venue("ATL", "Mercedes-Benz Stadium", "Atlanta", "GA", 33.7554, -84.4009, Retractable, Turf),
    venue("BAL", "M&T Bank Stadium", "Baltimore", "MD", 39.2780, -76.6227, Outdoor, Grass),
    venue("BUF", "Highmark Stadium", "Orchard Park", "NY", 42.7738, -78.7870, Outdoor, Turf),
    venue("CAR", "Bank of America Stadium", "Charlotte", "NC", 35.2258, -80.8528, Outdoor, Turf),
    venue("CHI", "Soldier Field", "Chicago", "IL", 41.8623, -87.6167, Outdoor, Grass),
    venue("CIN", "Paycor Stadium", "Cincinnati", "OH", 39.0955, -84.5161, Outdoor, Turf),
    venue("CLE", "Cleveland Browns Stadium", "Cleveland", "OH", 41.5061, -81.6995, Outdoor, Grass),
    venue("DAL", "AT&T Stadium", "Arlington", "TX", 32.7473, -97.0945, Retractable, Turf),
    venue("DEN", "Empower Field at Mile High", "Denver", "CO", 39.7439, -105.0201, Outdoor, Grass),
    venue("DET", "Ford Field", "Detroit", "MI", 42.3400, -83.0456, Dome, Turf),
    venue("GB", "Lambeau Field", "Green Bay", "WI", 44.5013, -88.0619, Outdoor, Hybrid),
    venue("HOU", "NRG Stadium", "Houston", "TX", 29.6847, -95.4107, Retractable, Turf),
    venue("IND", "Lucas Oil Stadium", "Indianapolis", "IN", 39.7601, -86.1639, Retractable, Turf),
    venue("JAX", "EverBank Stadium", "Jacksonville", "FL", 30.3240, -81.6373, Outdoor, Grass),
    venue("KC", "Arrowhead Stadium", "Kansas City", "MO", 39.0489, -94.4839, Outdoor, Grass),
    venue("LAC", "SoFi Stadium", "Inglewood", "CA", 33.9534, -118.3390, Dome, Turf),
    venue("LAR", "SoFi Stadium", "Inglewood", "CA", 33.9534, -118.3390, Dome, Turf),
    venue("LV", "Allegiant Stadium", "Las Vegas", "NV", 36.0909, -115.1833, Dome, Grass),
    venue("MIA", "Hard Rock Stadium", "Miami Gardens", "FL", 25.9580, -80.2389, Outdoor, Grass),
    venue("MIN", "U.S. Bank Stadium", "Minneapolis", "MN", 44.9735, -93.2575, Dome, Turf),
    venue("NE", "Gillette Stadium", "Foxborough", "MA", 42.0909, -71.2643, Outdoor, Turf),
    venue("NO", "Caesars Superdome", "New Orleans", "LA", 29.9511, -90.0812, Dome, Turf),
    venue("NYG", "MetLife Stadium", "East Rutherford", "NJ", 40.8128, -74.0742, Outdoor, Turf),
    venue("NYJ", "MetLife Stadium", "East Rutherford", "NJ", 40.8128, -74.0742, Outdoor, Turf),
    venue("PHI", "Lincoln Financial Field", "Philadelphia", "PA", 39.9008, -75.1675, Outdoor, Grass),
    venue("PIT", "Acrisure Stadium", "Pittsburgh", "PA", 40.4468, -80.0158, Outdoor, Grass),
    venue("SEA", "Lumen Field", "Seattle", "WA", 47.5952, -122.3316, Outdoor, Turf),
    venue("SF", "Levi's Stadium", "Santa Clara", "CA", 37.4033, -121.9702, Outdoor, Grass),
    venue("TB", "Raymond James Stadium", "Tampa", "FL", 27.9759, -82.5029, Outdoor, Grass),
    venue("TEN", "Nissan Stadium", "Nashville", "TN", 36.1665, -86.7713, Outdoor, Turf),
    venue("WAS", "Northwest Stadium", "Landover", "MD", 38.9076, -76.8645, Outdoor, Grass),
];

/// Case-insensitive lookup by team alias. `WSH` and `JAC` are accepted as
/// provider spellings of `WAS` and `JAX`.
pub fn stadium_for(team: &str) -> Option<&'static Stadium> {
    let alias = team.trim().to_ascii_uppercase();
    let alias = match alias.as_str() {
        "WSH" => "WAS",
        "JAC" => "JAX",
        "LA" => "LAR",
        other => other,
    };
    STADIUMS.iter().find(|s| s.team == alias)
}

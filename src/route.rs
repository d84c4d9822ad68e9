//! Route data model: Route → Legs → Steps → Intersections, plus the
//! spoken and visual instructions attached to each step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::{self, Coordinate};
use crate::options::RoutingOptions;

/// A point the route must pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Direction of approach in degrees, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_accuracy: Option<f64>,
    /// How far in meters the service may move this waypoint to reach a
    /// road. Negative means unlimited.
    pub coordinate_accuracy: f64,
}

impl Waypoint {
    pub fn new(coordinate: Coordinate) -> Self {
        Waypoint {
            coordinate,
            name: None,
            heading: None,
            heading_accuracy: None,
            coordinate_accuracy: -1.0,
        }
    }

    pub fn named(coordinate: Coordinate, name: impl Into<String>) -> Self {
        Waypoint {
            name: Some(name.into()),
            ..Waypoint::new(coordinate)
        }
    }
}

/// Kind of maneuver at the start of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverType {
    Depart,
    Turn,
    Continue,
    NewName,
    Merge,
    OnRamp,
    OffRamp,
    Fork,
    EndOfRoad,
    UseLane,
    Roundabout,
    Rotary,
    RoundaboutTurn,
    ExitRoundabout,
    ExitRotary,
    Notification,
    Arrive,
    Other(String),
}

impl ManeuverType {
    pub fn from_api(s: &str) -> Self {
        match s {
            "depart" => ManeuverType::Depart,
            "turn" => ManeuverType::Turn,
            "continue" => ManeuverType::Continue,
            "new name" => ManeuverType::NewName,
            "merge" => ManeuverType::Merge,
            "on ramp" => ManeuverType::OnRamp,
            "off ramp" => ManeuverType::OffRamp,
            "fork" => ManeuverType::Fork,
            "end of road" => ManeuverType::EndOfRoad,
            "use lane" => ManeuverType::UseLane,
            "roundabout" => ManeuverType::Roundabout,
            "rotary" => ManeuverType::Rotary,
            "roundabout turn" => ManeuverType::RoundaboutTurn,
            "exit roundabout" => ManeuverType::ExitRoundabout,
            "exit rotary" => ManeuverType::ExitRotary,
            "notification" => ManeuverType::Notification,
            "arrive" => ManeuverType::Arrive,
            other => ManeuverType::Other(other.to_string()),
        }
    }
}

/// Direction of a maneuver relative to the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverDirection {
    UTurn,
    SharpRight,
    Right,
    SlightRight,
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
}

impl ManeuverDirection {
    pub fn from_api(s: &str) -> Option<Self> {
        match s {
            "uturn" => Some(ManeuverDirection::UTurn),
            "sharp right" => Some(ManeuverDirection::SharpRight),
            "right" => Some(ManeuverDirection::Right),
            "slight right" => Some(ManeuverDirection::SlightRight),
            "straight" => Some(ManeuverDirection::Straight),
            "slight left" => Some(ManeuverDirection::SlightLeft),
            "left" => Some(ManeuverDirection::Left),
            "sharp left" => Some(ManeuverDirection::SharpLeft),
            _ => None,
        }
    }
}

/// A road-network junction recorded along a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub location: Coordinate,
    /// Bearings of the roads meeting here, in degrees.
    pub bearings: Vec<f64>,
    /// For each bearing, whether the road may be entered.
    pub entry: Vec<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_index: Option<usize>,
}

/// What a spoken instruction is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpokenInstructionKind {
    #[default]
    Maneuver,
    ControlZoneEnter,
    ControlZoneExit,
}

impl SpokenInstructionKind {
    pub fn from_api(s: &str) -> Option<Self> {
        match s {
            "maneuver" => Some(SpokenInstructionKind::Maneuver),
            "controlZoneEnter" => Some(SpokenInstructionKind::ControlZoneEnter),
            "controlZoneExit" => Some(SpokenInstructionKind::ControlZoneExit),
            _ => None,
        }
    }
}

/// An announcement to be spoken while travelling along a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpokenInstruction {
    /// Remaining distance to the end of the step at which to speak, in meters.
    pub distance_along_step: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssml_text: Option<String>,
    pub kind: SpokenInstructionKind,
}

/// Type of driving controls that may happen inside a control zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlZoneKind {
    Speed,
    Other,
}

impl ControlZoneKind {
    pub fn from_api(s: &str) -> Self {
        match s {
            "speed" => ControlZoneKind::Speed,
            _ => ControlZoneKind::Other,
        }
    }
}

/// A zone along the route in which driving may be controlled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlZone {
    pub kind: ControlZoneKind,
    /// Distance in meters the traveller will spend inside the zone.
    pub distance_along_route: f64,
}

/// A banner to be shown while travelling along a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualInstruction {
    /// Remaining distance to the end of the step at which to show, in meters.
    pub distance_along_step: f64,
    pub primary_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver_type: Option<ManeuverType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver_direction: Option<ManeuverDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_zone: Option<ControlZone>,
}

/// Posted speed limit along part of a leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxSpeed {
    /// None when the limit is unknown or there is none.
    pub speed: Option<f64>,
    /// `km/h` or `mph`.
    pub unit: Option<String>,
}

/// A maneuver-to-maneuver segment within a leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub coordinates: Vec<Coordinate>,
    /// Length of the step in meters.
    pub distance: f64,
    /// Expected travel time in seconds.
    pub expected_travel_time: f64,
    pub name: String,
    pub instruction: String,
    pub maneuver_type: ManeuverType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver_direction: Option<ManeuverDirection>,
    pub maneuver_location: Coordinate,
    /// Heading in degrees just before the maneuver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_heading: Option<f64>,
    /// Heading in degrees just after the maneuver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_heading: Option<f64>,
    pub intersections: Vec<Intersection>,
    /// None when the route was requested without voice guidance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoken_instructions: Option<Vec<SpokenInstruction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_instructions: Option<Vec<VisualInstruction>>,
}

impl RouteStep {
    /// Whether `other` describes the same maneuver: same kind, direction
    /// and road, performed at the same place. Durations and distances
    /// may differ, so a refreshed copy of a step still matches.
    pub fn same_maneuver(&self, other: &RouteStep) -> bool {
        const SAME_PLACE_M: f64 = 1.0;

        self.maneuver_type == other.maneuver_type
            && self.maneuver_direction == other.maneuver_direction
            && self.name == other.name
            && geo::haversine(&self.maneuver_location, &other.maneuver_location) <= SAME_PLACE_M
    }
}

/// The portion of a route between two consecutive waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Waypoint>,
    pub destination: Waypoint,
    pub steps: Vec<RouteStep>,
    /// Service-provided summary, usually the main roads of the leg.
    pub summary: String,
    pub distance: f64,
    pub expected_travel_time: f64,
    pub max_speeds: Vec<MaxSpeed>,
}

/// Which member of a provider-typed route pair a route is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    /// An updated version of the followed route.
    Current,
    /// A faster alternative to the `Current` route of the same response.
    Best,
}

impl RouteType {
    pub fn from_api(s: &str) -> Option<Self> {
        match s {
            "current" => Some(RouteType::Current),
            "best" => Some(RouteType::Best),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Current => "current",
            RouteType::Best => "best",
        }
    }
}

/// Extra data for routes returned by a provider that types its routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRouteInfo {
    pub route_type: RouteType,
    /// Token identifying this exact route for later refreshes.
    pub signature: String,
    /// Congestion label → display color.
    pub congestion_colors: BTreeMap<String, String>,
}

/// A route between two or more waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<RouteLeg>,
    pub distance: f64,
    pub expected_travel_time: f64,
    /// Options that produced this route, reused when asking for a new one.
    pub options: RoutingOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderRouteInfo>,
}

impl Route {
    pub fn route_type(&self) -> Option<RouteType> {
        self.provider.as_ref().map(|p| p.route_type)
    }

    pub fn signature(&self) -> Option<&str> {
        self.provider.as_ref().map(|p| p.signature.as_str())
    }

    pub fn first_step(&self) -> Option<&RouteStep> {
        self.legs.first().and_then(|leg| leg.steps.first())
    }

    /// Whether the step after this route's first step is the same
    /// maneuver as `upcoming`, i.e. the route keeps the traveller on
    /// their current near-term path.
    pub fn continues_with(&self, upcoming: &RouteStep) -> bool {
        self.legs
            .first()
            .and_then(|leg| leg.steps.get(1))
            .is_some_and(|second| second.same_maneuver(upcoming))
    }

    /// Canonical text used to compare routes: leg summaries, or the
    /// road names of a leg when it has no summary.
    pub fn description(&self) -> String {
        self.legs
            .iter()
            .map(|leg| {
                if leg.summary.is_empty() {
                    leg.steps
                        .iter()
                        .map(|s| s.name.as_str())
                        .filter(|n| !n.is_empty())
                        .collect::<Vec<_>>()
                        .join(", ")
                } else {
                    leg.summary.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" – ")
    }
}

//! Routing options and the directions request built from them.
//!
//! Options describe what to ask the directions service for; `request()`
//! turns them into a transport-agnostic [`DirectionsRequest`] that the
//! HTTP client (or a test double) executes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::route::Waypoint;

/// Version segment of the routing endpoint path.
pub const API_VERSION: &str = "1.0";

/// Geometry encoding requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeFormat {
    /// Encoded polyline, precision 5.
    #[default]
    Polyline,
    /// Encoded polyline, precision 6.
    Polyline6,
    GeoJson,
}

impl ShapeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeFormat::Polyline => "polyline",
            ShapeFormat::Polyline6 => "polyline6",
            ShapeFormat::GeoJson => "geojson",
        }
    }
}

/// Walking or cycling pace of the traveller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelSpeed {
    Slow,
    Normal,
    Fast,
}

impl TravelSpeed {
    pub fn from_api(s: &str) -> Option<Self> {
        match s {
            "slow" => Some(TravelSpeed::Slow),
            "normal" => Some(TravelSpeed::Normal),
            "fast" => Some(TravelSpeed::Fast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelSpeed::Slow => "slow",
            TravelSpeed::Normal => "normal",
            TravelSpeed::Fast => "fast",
        }
    }
}

/// Everything needed to ask the directions service for a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingOptions {
    pub waypoints: Vec<Waypoint>,
    /// Routing provider, part of the endpoint path.
    pub provider: String,
    /// Metric the service optimizes for (`route_type` query parameter).
    pub route_calculation_type: String,
    /// Correlation id shared with the request that produced the initial route.
    pub qid: String,
    pub locale: String,
    pub shape_format: ShapeFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motorbike_vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_speed: Option<TravelSpeed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike_speed: Option<TravelSpeed>,
    /// Signature of a previously returned route to ask an update of.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_signature: Option<String>,
    pub includes_alternative_routes: bool,
    /// Debug flag: make the service always answer with a "better" alternative.
    pub force_better_route: bool,
    /// Provider-specific parameters passed through verbatim.
    pub additional_query_params: BTreeMap<String, String>,
}

/// Query keys that map onto typed fields in [`RoutingOptions::from_query_params`].
const KNOWN_PARAMS: [&str; 6] = [
    "route_type",
    "qid",
    "vehicle",
    "motorbike_vehicle",
    "walk_speed",
    "bike_speed",
];

impl RoutingOptions {
    /// Options for turn-by-turn navigation between `waypoints`.
    pub fn new(
        waypoints: Vec<Waypoint>,
        provider: impl Into<String>,
        route_calculation_type: impl Into<String>,
        qid: impl Into<String>,
    ) -> NavResult<Self> {
        let options = RoutingOptions {
            waypoints: for_navigation(waypoints),
            provider: provider.into(),
            route_calculation_type: route_calculation_type.into(),
            qid: qid.into(),
            locale: "en".to_string(),
            shape_format: ShapeFormat::default(),
            car_vehicle: None,
            motorbike_vehicle: None,
            walk_speed: None,
            bike_speed: None,
            route_signature: None,
            includes_alternative_routes: true,
            force_better_route: false,
            additional_query_params: BTreeMap::new(),
        };
        options.validate()?;
        Ok(options)
    }

    /// Options built from raw query parameters, e.g. those of the
    /// request that produced the initial route. Known keys become typed
    /// fields; everything else is passed through.
    pub fn from_query_params(
        waypoints: Vec<Waypoint>,
        provider: impl Into<String>,
        mut params: BTreeMap<String, String>,
    ) -> NavResult<Self> {
        let walk_speed = params.get("walk_speed").and_then(|s| TravelSpeed::from_api(s));
        let bike_speed = params.get("bike_speed").and_then(|s| TravelSpeed::from_api(s));

        let mut options = RoutingOptions::new(
            waypoints,
            provider,
            params.get("route_type").cloned().unwrap_or_default(),
            params.get("qid").cloned().unwrap_or_default(),
        )?;
        options.car_vehicle = params.get("vehicle").cloned();
        options.motorbike_vehicle = params.get("motorbike_vehicle").cloned();
        options.walk_speed = walk_speed;
        options.bike_speed = bike_speed;

        for key in KNOWN_PARAMS {
            params.remove(key);
        }
        options.additional_query_params = params;
        Ok(options)
    }

    pub fn validate(&self) -> NavResult<()> {
        if self.waypoints.len() < 2 {
            return Err(NavError::InvalidOptions(format!(
                "at least 2 waypoints are required, got {}",
                self.waypoints.len()
            )));
        }
        if self.provider.is_empty() || self.provider.contains('/') {
            return Err(NavError::InvalidOptions(format!(
                "invalid provider {:?}",
                self.provider
            )));
        }
        let bad_coordinate = self.waypoints.iter().any(|w| {
            !(-90.0..=90.0).contains(&w.coordinate.lat) || !(-180.0..=180.0).contains(&w.coordinate.lon)
        });
        if bad_coordinate {
            return Err(NavError::InvalidOptions("waypoint coordinate out of range".into()));
        }
        Ok(())
    }

    /// Copy of these options with different waypoints.
    pub fn with_waypoints(&self, waypoints: Vec<Waypoint>) -> Self {
        RoutingOptions {
            waypoints: for_navigation(waypoints),
            ..self.clone()
        }
    }

    /// Endpoint path, relative to the service base URL.
    pub fn path(&self) -> String {
        let coordinates = self
            .waypoints
            .iter()
            .map(|w| format!("{:.6},{:.6}", w.coordinate.lon, w.coordinate.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!("gps/{API_VERSION}/{}/{coordinates}", self.provider)
    }

    /// Query parameters, in the order they are sent.
    pub fn query_items(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("geometries".to_string(), self.shape_format.as_str().to_string()),
            ("lang".to_string(), self.locale.clone()),
            ("qid".to_string(), self.qid.clone()),
            ("route_type".to_string(), self.route_calculation_type.clone()),
        ];

        if self.route_signature.is_some() {
            params.push((
                "alternatives".to_string(),
                self.includes_alternative_routes.to_string(),
            ));
            if self.force_better_route && self.includes_alternative_routes {
                params.push(("dev_better_route_threshold".to_string(), "-1".to_string()));
            }
        }

        if let Some(heading) = self.waypoints.first().and_then(|w| w.heading) {
            if heading >= 0.0 {
                params.push(("bearing".to_string(), ((heading % 360.0) as i64).to_string()));
            }
        }
        if let Some(vehicle) = &self.car_vehicle {
            params.push(("vehicle".to_string(), vehicle.clone()));
        }
        if let Some(vehicle) = &self.motorbike_vehicle {
            params.push(("motorbike_vehicle".to_string(), vehicle.clone()));
        }
        if let Some(speed) = self.walk_speed {
            params.push(("walk_speed".to_string(), speed.as_str().to_string()));
        }
        if let Some(speed) = self.bike_speed {
            params.push(("bike_speed".to_string(), speed.as_str().to_string()));
        }

        if self.waypoints.iter().any(|w| w.name.is_some()) {
            let names = self
                .waypoints
                .iter()
                .map(|w| w.name.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(";");
            params.push(("waypoint_names".to_string(), names));
        }

        params.extend(
            self.additional_query_params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        params
    }

    /// JSON request body: only sent when asking for an update of a signed route.
    pub fn body(&self) -> Option<String> {
        self.route_signature
            .as_ref()
            .map(|signature| serde_json::json!({ "mappy_signature": signature }).to_string())
    }

    pub fn request(&self) -> DirectionsRequest {
        let body = self.body();
        DirectionsRequest {
            method: if body.is_some() {
                HttpMethod::Post
            } else {
                HttpMethod::Get
            },
            path: self.path(),
            query: self.query_items(),
            content_type: body.as_ref().map(|_| "application/json"),
            body,
        }
    }
}

/// Navigation waypoints may be snapped to any distance.
fn for_navigation(waypoints: Vec<Waypoint>) -> Vec<Waypoint> {
    waypoints
        .into_iter()
        .map(|w| Waypoint {
            coordinate_accuracy: -1.0,
            ..w
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A fully described call to the directions service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'static str>,
}

impl DirectionsRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

//! Directions response parsing.
//!
//! The service answers with a JSON document holding `waypoints[]` and
//! `routes[]`, optionally tagged with provider fields
//! (`mappy_designation`, `mappy_signature`, `mappy_congestion_colors`).
//! Parsing is all-or-nothing: any missing required field rejects the
//! whole response as [`NavError::MalformedResponse`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{NavError, NavResult};
use crate::geo::{self, Coordinate};
use crate::options::{RoutingOptions, ShapeFormat};
use crate::route::{
    ControlZone, ControlZoneKind, Intersection, ManeuverDirection, ManeuverType, MaxSpeed,
    ProviderRouteInfo, Route, RouteLeg, RouteStep, RouteType, SpokenInstruction,
    SpokenInstructionKind, VisualInstruction, Waypoint,
};

/// Parsed directions response.
#[derive(Debug, Clone)]
pub struct DirectionsResponse {
    /// Request waypoints, corrected and named by the service.
    pub waypoints: Vec<Waypoint>,
    /// Candidate routes in response order.
    pub routes: Vec<Route>,
}

impl DirectionsResponse {
    /// Whether the provider tagged its routes as a current/best pair.
    pub fn is_typed(&self) -> bool {
        self.routes.iter().any(|r| r.provider.is_some())
    }

    pub fn route_of_type(&self, route_type: RouteType) -> Option<&Route> {
        self.routes.iter().find(|r| r.route_type() == Some(route_type))
    }
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    waypoints: Option<Vec<RawWaypoint>>,
    routes: Vec<RawRoute>,
    #[serde(default)]
    mappy_congestion_colors: Option<Vec<RawCongestionColor>>,
}

#[derive(Deserialize)]
struct RawWaypoint {
    location: [f64; 2],
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawCongestionColor {
    label: Option<String>,
    color: Option<String>,
}

#[derive(Deserialize)]
struct RawRoute {
    distance: f64,
    duration: f64,
    legs: Vec<RawLeg>,
    #[serde(default)]
    mappy_designation: Option<String>,
    #[serde(default)]
    mappy_signature: Option<String>,
}

#[derive(Deserialize)]
struct RawLeg {
    #[serde(default)]
    summary: String,
    distance: f64,
    duration: f64,
    steps: Vec<RawStep>,
    #[serde(default)]
    annotation: Option<RawAnnotation>,
}

#[derive(Deserialize)]
struct RawAnnotation {
    #[serde(default)]
    maxspeed: Vec<RawMaxSpeed>,
}

#[derive(Deserialize)]
struct RawMaxSpeed {
    speed: Option<f64>,
    unit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    distance: f64,
    duration: f64,
    geometry: RawGeometry,
    #[serde(default)]
    name: String,
    maneuver: RawManeuver,
    #[serde(default)]
    intersections: Vec<RawIntersection>,
    #[serde(default)]
    voice_instructions: Option<Vec<RawVoiceInstruction>>,
    #[serde(default)]
    banner_instructions: Option<Vec<RawBannerInstruction>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGeometry {
    Encoded(String),
    LineString { coordinates: Vec<[f64; 2]> },
}

#[derive(Deserialize)]
struct RawManeuver {
    location: [f64; 2],
    #[serde(default)]
    bearing_before: Option<f64>,
    #[serde(default)]
    bearing_after: Option<f64>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    instruction: String,
}

#[derive(Deserialize)]
struct RawIntersection {
    location: [f64; 2],
    #[serde(default)]
    bearings: Vec<f64>,
    #[serde(default)]
    entry: Vec<bool>,
    #[serde(rename = "in", default)]
    in_index: Option<usize>,
    #[serde(default)]
    out: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVoiceInstruction {
    distance_along_geometry: f64,
    announcement: String,
    #[serde(default)]
    ssml_announcement: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBannerInstruction {
    distance_along_geometry: f64,
    primary: RawBannerText,
    #[serde(default)]
    secondary: Option<RawBannerText>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBannerText {
    text: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    control_zone_type: Option<String>,
    #[serde(default)]
    distance_until_end_of_control_zone: Option<f64>,
}

#[derive(Deserialize)]
struct RawServiceError {
    status: u16,
    message: String,
    #[serde(default)]
    id: Option<String>,
}

/// Decodes a structured service error document
/// (`{"status": 400, "message": "...", "id": "..."}`).
pub fn parse_service_error(body: &str) -> Option<NavError> {
    let raw: RawServiceError = serde_json::from_str(body).ok()?;
    Some(NavError::Service {
        status: raw.status,
        message: raw.message,
        id: raw.id,
    })
}

/// Parses a directions response produced for `options`.
///
/// Every route receives a copy of `options` carrying its own signature
/// (so it can later be refreshed) with the debug `force_better_route`
/// flag cleared.
pub fn parse_response(options: &RoutingOptions, json: &str) -> NavResult<DirectionsResponse> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.get("routes").is_none() {
        if let Some(error) = parse_service_error(json) {
            return Err(error);
        }
    }
    let raw: RawResponse = serde_json::from_value(value)?;

    let waypoints = match raw.waypoints {
        Some(api) => api
            .into_iter()
            .zip(options.waypoints.iter())
            .map(|(api, local)| Waypoint {
                coordinate: Coordinate::from_lon_lat(api.location),
                name: local
                    .name
                    .clone()
                    .or(api.name.filter(|name| !name.is_empty())),
                ..local.clone()
            })
            .collect(),
        None => options.waypoints.clone(),
    };

    let congestion_colors: BTreeMap<String, String> = raw
        .mappy_congestion_colors
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            (
                c.label.unwrap_or_else(|| "unknown".to_string()),
                c.color.unwrap_or_else(|| "#000000".to_string()),
            )
        })
        .collect();

    let routes = raw
        .routes
        .into_iter()
        .map(|r| convert_route(r, options, &waypoints, &congestion_colors))
        .collect::<NavResult<Vec<_>>>()?;

    Ok(DirectionsResponse { waypoints, routes })
}

fn convert_route(
    raw: RawRoute,
    options: &RoutingOptions,
    waypoints: &[Waypoint],
    congestion_colors: &BTreeMap<String, String>,
) -> NavResult<Route> {
    if raw.legs.is_empty() {
        return Err(NavError::MalformedResponse("route without legs".into()));
    }
    if waypoints.len() < raw.legs.len() + 1 {
        return Err(NavError::MalformedResponse(format!(
            "{} legs but only {} waypoints",
            raw.legs.len(),
            waypoints.len()
        )));
    }

    let provider = if raw.mappy_designation.is_some() || raw.mappy_signature.is_some() {
        Some(ProviderRouteInfo {
            route_type: raw
                .mappy_designation
                .as_deref()
                .and_then(RouteType::from_api)
                .unwrap_or(RouteType::Current),
            signature: raw.mappy_signature.unwrap_or_default(),
            congestion_colors: congestion_colors.clone(),
        })
    } else {
        None
    };

    let mut route_options = options.clone();
    route_options.waypoints = waypoints.to_vec();
    route_options.force_better_route = false;
    if let Some(info) = &provider {
        route_options.route_signature = Some(info.signature.clone());
    }

    let legs = raw
        .legs
        .into_iter()
        .enumerate()
        .map(|(i, leg)| {
            convert_leg(
                leg,
                waypoints[i].clone(),
                waypoints[i + 1].clone(),
                options.shape_format,
            )
        })
        .collect::<NavResult<Vec<_>>>()?;

    Ok(Route {
        legs,
        distance: raw.distance,
        expected_travel_time: raw.duration,
        options: route_options,
        provider,
    })
}

fn convert_leg(
    raw: RawLeg,
    source: Waypoint,
    destination: Waypoint,
    shape_format: ShapeFormat,
) -> NavResult<RouteLeg> {
    if raw.steps.is_empty() {
        return Err(NavError::MalformedResponse("leg without steps".into()));
    }

    let steps = raw
        .steps
        .into_iter()
        .map(|s| convert_step(s, shape_format))
        .collect::<NavResult<Vec<_>>>()?;

    let max_speeds = raw
        .annotation
        .map(|a| {
            a.maxspeed
                .into_iter()
                .map(|m| MaxSpeed {
                    speed: m.speed,
                    unit: m.unit,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(RouteLeg {
        source: Some(source),
        destination,
        steps,
        summary: raw.summary,
        distance: raw.distance,
        expected_travel_time: raw.duration,
        max_speeds,
    })
}

fn convert_step(raw: RawStep, shape_format: ShapeFormat) -> NavResult<RouteStep> {
    let maneuver_location = Coordinate::from_lon_lat(raw.maneuver.location);

    let mut coordinates = match raw.geometry {
        RawGeometry::Encoded(encoded) => {
            let precision = match shape_format {
                ShapeFormat::Polyline6 => 6,
                _ => 5,
            };
            decode_polyline(&encoded, precision)?
        }
        RawGeometry::LineString { coordinates } => {
            coordinates.into_iter().map(Coordinate::from_lon_lat).collect()
        }
    };
    if coordinates.is_empty() {
        coordinates.push(maneuver_location);
    }

    let intersections = raw
        .intersections
        .into_iter()
        .map(|i| Intersection {
            location: Coordinate::from_lon_lat(i.location),
            bearings: i.bearings,
            entry: i.entry,
            in_index: i.in_index,
            out_index: i.out,
        })
        .collect();

    let spoken_instructions = raw.voice_instructions.map(|list| {
        list.into_iter()
            .map(|v| SpokenInstruction {
                distance_along_step: v.distance_along_geometry,
                text: v.announcement,
                ssml_text: v.ssml_announcement,
                kind: v
                    .kind
                    .as_deref()
                    .and_then(SpokenInstructionKind::from_api)
                    .unwrap_or_default(),
            })
            .collect()
    });

    let visual_instructions = raw.banner_instructions.map(|list| {
        list.into_iter()
            .map(|b| {
                let control_zone = b.primary.control_zone_type.as_deref().map(|kind| ControlZone {
                    kind: ControlZoneKind::from_api(kind),
                    distance_along_route: b.primary.distance_until_end_of_control_zone.unwrap_or(0.0),
                });
                VisualInstruction {
                    distance_along_step: b.distance_along_geometry,
                    maneuver_type: b.primary.kind.as_deref().map(ManeuverType::from_api),
                    maneuver_direction: b
                        .primary
                        .modifier
                        .as_deref()
                        .and_then(ManeuverDirection::from_api),
                    primary_text: b.primary.text,
                    secondary_text: b.secondary.map(|s| s.text),
                    control_zone,
                }
            })
            .collect()
    });

    Ok(RouteStep {
        distance: raw.distance,
        expected_travel_time: raw.duration,
        name: raw.name,
        instruction: raw.maneuver.instruction,
        maneuver_type: ManeuverType::from_api(&raw.maneuver.kind),
        maneuver_direction: raw
            .maneuver
            .modifier
            .as_deref()
            .and_then(ManeuverDirection::from_api),
        maneuver_location,
        initial_heading: raw.maneuver.bearing_before.map(|h| geo::wrap(h, 0.0, 360.0)),
        final_heading: raw.maneuver.bearing_after.map(|h| geo::wrap(h, 0.0, 360.0)),
        coordinates,
        intersections,
        spoken_instructions,
        visual_instructions,
    })
}

/// Decodes an encoded polyline with the given precision (5 or 6 digits).
pub fn decode_polyline(encoded: &str, precision: u32) -> NavResult<Vec<Coordinate>> {
    let line = polyline::decode_polyline(encoded, precision)
        .map_err(|e| NavError::MalformedResponse(format!("invalid polyline: {e}")))?;
    Ok(line.coords().map(|c| Coordinate::new(c.y, c.x)).collect())
}

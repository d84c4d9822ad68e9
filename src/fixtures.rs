//! Hand-built routes and fixes shared by the unit tests.

use std::time::{Duration, SystemTime};

use serde_json::{json, Value};

use crate::geo::{self, Coordinate};
use crate::location::LocationFix;
use crate::options::RoutingOptions;
use crate::route::{
    Intersection, ManeuverDirection, ManeuverType, ProviderRouteInfo, Route, RouteLeg, RouteStep,
    RouteType, SpokenInstruction, SpokenInstructionKind, VisualInstruction, Waypoint,
};

/// Corners of the L-shaped route: start, turn, destination.
pub fn corners() -> (Coordinate, Coordinate, Coordinate) {
    let a = Coordinate::new(48.0, 16.0);
    let b = geo::destination(&a, 1500.0, 90.0);
    let c = geo::destination(&b, 1000.0, 0.0);
    (a, b, c)
}

/// Point `meters` east of the start, on First Street.
pub fn on_first_street(meters: f64) -> Coordinate {
    geo::destination(&corners().0, meters, 90.0)
}

/// Point `meters` north of the turn, on Second Street.
pub fn on_second_street(meters: f64) -> Coordinate {
    geo::destination(&corners().1, meters, 0.0)
}

pub fn fix_at(coordinate: Coordinate, course: f64, secs: u64) -> LocationFix {
    LocationFix::new(coordinate, 5.0, SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .with_course(course)
        .with_speed(10.0)
}

fn spoken(distance_along_step: f64, text: &str) -> SpokenInstruction {
    SpokenInstruction {
        distance_along_step,
        text: text.to_string(),
        ssml_text: None,
        kind: SpokenInstructionKind::Maneuver,
    }
}

fn visual(distance_along_step: f64, text: &str, maneuver_type: ManeuverType) -> VisualInstruction {
    VisualInstruction {
        distance_along_step,
        primary_text: text.to_string(),
        secondary_text: None,
        maneuver_type: Some(maneuver_type),
        maneuver_direction: None,
        control_zone: None,
    }
}

fn junction(location: Coordinate, bearings: Vec<f64>) -> Intersection {
    Intersection {
        location,
        entry: vec![true; bearings.len()],
        bearings,
        in_index: None,
        out_index: Some(0),
    }
}

fn arrive_step(at: Coordinate, heading: f64, name: &str) -> RouteStep {
    RouteStep {
        coordinates: vec![at, at],
        distance: 0.0,
        expected_travel_time: 0.0,
        name: name.to_string(),
        instruction: "You have arrived".to_string(),
        maneuver_type: ManeuverType::Arrive,
        maneuver_direction: None,
        maneuver_location: at,
        initial_heading: Some(heading),
        final_heading: Some(heading),
        intersections: vec![junction(at, vec![geo::wrap(heading + 180.0, 0.0, 360.0)])],
        spoken_instructions: Some(Vec::new()),
        visual_instructions: Some(Vec::new()),
    }
}

/// One leg: east along First Street for 1500 m, left onto Second
/// Street for 1000 m, arrive. Slow traffic, so the trip is long
/// enough for faster-route checks.
pub fn l_shaped_route() -> Route {
    let (a, b, c) = corners();
    let mid = on_first_street(700.0);

    let first = vec![a, mid, b];
    let second = vec![b, c];

    let depart = RouteStep {
        distance: geo::polyline_length(&first),
        expected_travel_time: 900.0,
        name: "First Street".to_string(),
        instruction: "Head east on First Street".to_string(),
        maneuver_type: ManeuverType::Depart,
        maneuver_direction: None,
        maneuver_location: a,
        initial_heading: Some(0.0),
        final_heading: Some(90.0),
        intersections: vec![junction(a, vec![90.0]), junction(mid, vec![0.0, 90.0, 270.0])],
        spoken_instructions: Some(vec![
            spoken(1500.0, "Head east on First Street"),
            spoken(400.0, "In 400 meters, turn left onto Second Street"),
            spoken(80.0, "Turn left onto Second Street"),
        ]),
        visual_instructions: Some(vec![visual(1500.0, "Second Street", ManeuverType::Turn)]),
        coordinates: first,
    };

    let turn = RouteStep {
        distance: geo::polyline_length(&second),
        expected_travel_time: 600.0,
        name: "Second Street".to_string(),
        instruction: "Turn left onto Second Street".to_string(),
        maneuver_type: ManeuverType::Turn,
        maneuver_direction: Some(ManeuverDirection::Left),
        maneuver_location: b,
        initial_heading: Some(90.0),
        final_heading: Some(0.0),
        intersections: vec![junction(b, vec![0.0, 90.0, 270.0])],
        spoken_instructions: Some(vec![
            spoken(1000.0, "Continue on Second Street for 1 kilometer"),
            spoken(100.0, "You will arrive at your destination"),
        ]),
        visual_instructions: Some(vec![visual(1000.0, "Home", ManeuverType::Arrive)]),
        coordinates: second,
    };

    let arrive = arrive_step(c, 0.0, "Second Street");

    let origin = Waypoint::new(a);
    let destination = Waypoint::named(c, "Home");
    let leg = RouteLeg {
        source: Some(origin.clone()),
        destination: destination.clone(),
        distance: depart.distance + turn.distance,
        expected_travel_time: depart.expected_travel_time + turn.expected_travel_time,
        steps: vec![depart, turn, arrive],
        summary: String::new(),
        max_speeds: Vec::new(),
    };

    Route {
        distance: leg.distance,
        expected_travel_time: leg.expected_travel_time,
        legs: vec![leg],
        options: RoutingOptions::new(vec![origin, destination], "car", "fastest", "qid-1").unwrap(),
        provider: None,
    }
}

/// Two legs: start → turn corner ("Stop"), then turn corner → destination.
pub fn two_leg_route() -> Route {
    let (a, b, c) = corners();

    let leg = |from: Coordinate, to: Coordinate, heading: f64, name: &str, dest: Waypoint| {
        let line = vec![from, to];
        let depart = RouteStep {
            distance: geo::polyline_length(&line),
            expected_travel_time: 300.0,
            name: name.to_string(),
            instruction: format!("Head along {name}"),
            maneuver_type: ManeuverType::Depart,
            maneuver_direction: None,
            maneuver_location: from,
            initial_heading: Some(heading),
            final_heading: Some(heading),
            intersections: vec![junction(from, vec![heading])],
            spoken_instructions: Some(vec![spoken(1500.0, name), spoken(50.0, "Arriving")]),
            visual_instructions: Some(vec![]),
            coordinates: line,
        };
        RouteLeg {
            source: None,
            destination: dest,
            distance: depart.distance,
            expected_travel_time: depart.expected_travel_time,
            steps: vec![depart, arrive_step(to, heading, name)],
            summary: name.to_string(),
            max_speeds: Vec::new(),
        }
    };

    let stop = Waypoint::named(b, "Stop");
    let home = Waypoint::named(c, "Home");
    let legs = vec![
        leg(a, b, 90.0, "First Street", stop.clone()),
        leg(b, c, 0.0, "Second Street", home.clone()),
    ];

    Route {
        distance: legs.iter().map(|l| l.distance).sum(),
        expected_travel_time: legs.iter().map(|l| l.expected_travel_time).sum(),
        legs,
        options: RoutingOptions::new(vec![Waypoint::new(a), stop, home], "car", "fastest", "qid-2")
            .unwrap(),
        provider: None,
    }
}

/// Tags `route` as a provider-typed route.
pub fn typed(mut route: Route, route_type: RouteType, signature: &str) -> Route {
    route.options.route_signature = Some(signature.to_string());
    route.provider = Some(ProviderRouteInfo {
        route_type,
        signature: signature.to_string(),
        congestion_colors: Default::default(),
    });
    route
}

fn lon_lat(c: &Coordinate) -> Value {
    json!([c.lon, c.lat])
}

fn maneuver_type_name(t: &ManeuverType) -> &str {
    match t {
        ManeuverType::Depart => "depart",
        ManeuverType::Turn => "turn",
        ManeuverType::Arrive => "arrive",
        ManeuverType::NewName => "new name",
        ManeuverType::Other(name) => name.as_str(),
        _ => "continue",
    }
}

fn direction_name(d: ManeuverDirection) -> &'static str {
    match d {
        ManeuverDirection::UTurn => "uturn",
        ManeuverDirection::SharpRight => "sharp right",
        ManeuverDirection::Right => "right",
        ManeuverDirection::SlightRight => "slight right",
        ManeuverDirection::Straight => "straight",
        ManeuverDirection::SlightLeft => "slight left",
        ManeuverDirection::Left => "left",
        ManeuverDirection::SharpLeft => "sharp left",
    }
}

fn step_json(step: &RouteStep) -> Value {
    json!({
        "distance": step.distance,
        "duration": step.expected_travel_time,
        "name": step.name,
        "geometry": {
            "type": "LineString",
            "coordinates": step.coordinates.iter().map(lon_lat).collect::<Vec<_>>(),
        },
        "maneuver": {
            "location": lon_lat(&step.maneuver_location),
            "bearing_before": step.initial_heading,
            "bearing_after": step.final_heading,
            "type": maneuver_type_name(&step.maneuver_type),
            "modifier": step.maneuver_direction.map(direction_name),
            "instruction": step.instruction,
        },
        "intersections": step.intersections.iter().map(|i| json!({
            "location": lon_lat(&i.location),
            "bearings": i.bearings,
            "entry": i.entry,
            "out": i.out_index,
        })).collect::<Vec<_>>(),
        "voiceInstructions": step.spoken_instructions.as_ref().map(|list| list.iter().map(|s| json!({
            "distanceAlongGeometry": s.distance_along_step,
            "announcement": s.text,
        })).collect::<Vec<_>>()),
        "bannerInstructions": step.visual_instructions.as_ref().map(|list| list.iter().map(|v| json!({
            "distanceAlongGeometry": v.distance_along_step,
            "primary": { "text": v.primary_text },
        })).collect::<Vec<_>>()),
    })
}

/// Encodes `routes` as a directions service response document.
pub fn response_json(routes: &[Route]) -> String {
    let waypoints = routes
        .first()
        .map(|r| {
            r.options
                .waypoints
                .iter()
                .map(|w| json!({ "location": lon_lat(&w.coordinate), "name": w.name }))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let routes = routes
        .iter()
        .map(|route| {
            let mut value = json!({
                "distance": route.distance,
                "duration": route.expected_travel_time,
                "legs": route.legs.iter().map(|leg| json!({
                    "summary": leg.summary,
                    "distance": leg.distance,
                    "duration": leg.expected_travel_time,
                    "steps": leg.steps.iter().map(step_json).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
            });
            if let Some(info) = &route.provider {
                value["mappy_designation"] = json!(info.route_type.as_str());
                value["mappy_signature"] = json!(info.signature);
            }
            value
        })
        .collect::<Vec<_>>();

    json!({ "code": "Ok", "waypoints": waypoints, "routes": routes }).to_string()
}

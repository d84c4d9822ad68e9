use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::{json, Value};

use navtrack::directions;
use navtrack::geo::{self, Coordinate};
use navtrack::progress::RouteProgress;
use navtrack::route::Route;
use navtrack::{
    Command, DirectionsCall, LocationFix, NavError, NavigationConfig, NavigationObserver,
    NavigationState, RequestKind, RouteController, RoutingOptions, Waypoint,
};

fn corners() -> (Coordinate, Coordinate, Coordinate) {
    let a = Coordinate::new(48.0, 16.0);
    let b = geo::destination(&a, 1500.0, 90.0);
    let c = geo::destination(&b, 1000.0, 0.0);
    (a, b, c)
}

fn east(meters: f64) -> Coordinate {
    geo::destination(&corners().0, meters, 90.0)
}

fn north(meters: f64) -> Coordinate {
    geo::destination(&corners().1, meters, 0.0)
}

fn lon_lat(c: &Coordinate) -> Value {
    json!([c.lon, c.lat])
}

fn options() -> RoutingOptions {
    let (a, _, c) = corners();
    RoutingOptions::new(
        vec![Waypoint::new(a), Waypoint::named(c, "Home")],
        "car",
        "fastest",
        "scenario",
    )
    .unwrap()
}

/// East for 1500 m, left, north for 1000 m, as the service would send it.
fn route_json(summary: &str, duration: f64, provider: Option<(&str, &str)>) -> Value {
    let (a, b, c) = corners();
    let mid = east(700.0);
    let mut route = json!({
        "distance": 2500.0,
        "duration": duration,
        "legs": [{
            "summary": summary,
            "distance": 2500.0,
            "duration": 1500.0,
            "steps": [
                {
                    "distance": 1500.0,
                    "duration": 900.0,
                    "name": "First Street",
                    "geometry": { "type": "LineString", "coordinates": [lon_lat(&a), lon_lat(&mid), lon_lat(&b)] },
                    "maneuver": { "location": lon_lat(&a), "bearing_before": 0.0, "bearing_after": 90.0,
                                  "type": "depart", "instruction": "Head east on First Street" },
                    "intersections": [
                        { "location": lon_lat(&a), "bearings": [90.0], "entry": [true], "out": 0 },
                        { "location": lon_lat(&mid), "bearings": [0.0, 90.0, 270.0], "entry": [true, true, true], "out": 0 }
                    ],
                    "voiceInstructions": [
                        { "distanceAlongGeometry": 1500.0, "announcement": "Head east on First Street" },
                        { "distanceAlongGeometry": 400.0, "announcement": "In 400 meters, turn left onto Second Street" },
                        { "distanceAlongGeometry": 80.0, "announcement": "Turn left onto Second Street" }
                    ],
                    "bannerInstructions": [
                        { "distanceAlongGeometry": 1500.0, "primary": { "text": "Second Street", "type": "turn", "modifier": "left" } }
                    ]
                },
                {
                    "distance": 1000.0,
                    "duration": 600.0,
                    "name": "Second Street",
                    "geometry": { "type": "LineString", "coordinates": [lon_lat(&b), lon_lat(&c)] },
                    "maneuver": { "location": lon_lat(&b), "bearing_before": 90.0, "bearing_after": 0.0,
                                  "type": "turn", "modifier": "left", "instruction": "Turn left onto Second Street" },
                    "intersections": [
                        { "location": lon_lat(&b), "bearings": [0.0, 90.0, 270.0], "entry": [true, true, true], "out": 0 }
                    ],
                    "voiceInstructions": [
                        { "distanceAlongGeometry": 1000.0, "announcement": "Continue on Second Street for 1 kilometer" },
                        { "distanceAlongGeometry": 100.0, "announcement": "You will arrive at your destination" }
                    ],
                    "bannerInstructions": [
                        { "distanceAlongGeometry": 1000.0, "primary": { "text": "Home", "type": "arrive" } }
                    ]
                },
                {
                    "distance": 0.0,
                    "duration": 0.0,
                    "name": "Second Street",
                    "geometry": { "type": "LineString", "coordinates": [lon_lat(&c), lon_lat(&c)] },
                    "maneuver": { "location": lon_lat(&c), "bearing_before": 0.0, "bearing_after": 0.0,
                                  "type": "arrive", "instruction": "You have arrived" },
                    "intersections": [
                        { "location": lon_lat(&c), "bearings": [180.0], "entry": [true], "out": 0 }
                    ],
                    "voiceInstructions": [],
                    "bannerInstructions": []
                }
            ]
        }]
    });
    if let Some((designation, signature)) = provider {
        route["mappy_designation"] = json!(designation);
        route["mappy_signature"] = json!(signature);
    }
    route
}

fn response(routes: Vec<Value>) -> String {
    let (a, _, c) = corners();
    json!({
        "code": "Ok",
        "waypoints": [
            { "location": lon_lat(&a), "name": "First Street" },
            { "location": lon_lat(&c), "name": "Second Street" }
        ],
        "routes": routes,
    })
    .to_string()
}

fn parse_first(body: &str) -> Route {
    directions::parse_response(&options(), body)
        .unwrap()
        .routes
        .remove(0)
}

fn fix(coordinate: Coordinate, course: f64, secs: u64) -> LocationFix {
    LocationFix::new(coordinate, 5.0, SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .with_course(course)
        .with_speed(10.0)
}

fn wrong_way(along: f64, secs: u64) -> LocationFix {
    let mut fix = fix(geo::destination(&east(along), 25.0, 180.0), 270.0, secs);
    fix.horizontal_accuracy = 10.0;
    fix
}

fn sent(commands: &[Command]) -> Vec<&DirectionsCall> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::Send(call) => Some(call),
            Command::Cancel(_) => None,
        })
        .collect()
}

#[derive(Default)]
struct Log {
    spoken: Vec<String>,
    reroutes: usize,
    failures: Vec<NavError>,
    faster: Vec<f64>,
    refreshes: usize,
}

impl NavigationObserver for Log {
    fn passed_spoken_instruction(
        &mut self,
        _progress: &RouteProgress,
        instruction: &navtrack::route::SpokenInstruction,
    ) {
        self.spoken.push(instruction.text.clone());
    }

    fn did_reroute(&mut self, _progress: &RouteProgress, _proactive: bool) {
        self.reroutes += 1;
    }

    fn reroute_failed(&mut self, _progress: &RouteProgress, error: &NavError) {
        self.failures.push(error.clone());
    }

    fn faster_route_available(&mut self, _progress: &RouteProgress, route: &Route) {
        self.faster.push(route.expected_travel_time);
    }

    fn did_refresh(&mut self, _progress: &RouteProgress) {
        self.refreshes += 1;
    }
}

fn go_off_route(controller: &mut RouteController, log: &mut Log) -> DirectionsCall {
    for (i, along) in [600.0, 590.0, 580.0, 570.0].into_iter().enumerate() {
        assert!(controller.update_location(wrong_way(along, i as u64), log).is_empty());
    }
    let commands = controller.update_location(wrong_way(560.0, 4), log);
    let calls = sent(&commands);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, RequestKind::Reroute);
    calls[0].clone()
}

#[test]
fn follows_the_route_through_the_turn() {
    let route = parse_first(&response(vec![route_json("", 1500.0, None)]));
    let mut controller = RouteController::new(route, NavigationConfig::default()).unwrap();
    let mut log = Log::default();

    controller.update_location(fix(east(10.0), 90.0, 0), &mut log);
    controller.update_location(fix(east(1450.0), 90.0, 1), &mut log);
    assert_eq!(controller.route_progress().current_leg_progress.step_index(), 0);

    controller.update_location(fix(north(30.0), 0.0, 2), &mut log);
    assert_eq!(controller.route_progress().current_leg_progress.step_index(), 1);
    assert_eq!(controller.state(), NavigationState::Tracking);
    assert_eq!(log.spoken.first().map(String::as_str), Some("Head east on First Street"));
    assert_eq!(
        log.spoken.last().map(String::as_str),
        Some("Continue on Second Street for 1 kilometer")
    );
}

#[test]
fn reroutes_after_leaving_the_route() {
    let route = parse_first(&response(vec![route_json("", 1500.0, None)]));
    let mut controller = RouteController::new(route, NavigationConfig::default()).unwrap();
    let mut log = Log::default();

    let call = go_off_route(&mut controller, &mut log);
    assert_eq!(controller.state(), NavigationState::Rerouting);
    assert!(call.request.path.starts_with("gps/1.0/car/"));

    controller.apply_response(
        call.ticket,
        Ok(response(vec![route_json("Detour", 1500.0, None)])),
        &mut log,
    );
    assert_eq!(log.reroutes, 1);
    assert_eq!(controller.state(), NavigationState::Tracking);
    assert_eq!(controller.route_progress().route().legs[0].summary, "Detour");
}

#[test]
fn response_without_routes_keeps_the_route() {
    let route = parse_first(&response(vec![route_json("", 1500.0, None)]));
    let mut controller = RouteController::new(route, NavigationConfig::default()).unwrap();
    let mut log = Log::default();
    let before = Arc::clone(controller.route_progress().route());

    let call = go_off_route(&mut controller, &mut log);
    controller.apply_response(call.ticket, Ok(r#"{"code": "Ok"}"#.to_string()), &mut log);

    assert_eq!(log.reroutes, 0);
    assert!(matches!(log.failures.as_slice(), [NavError::MalformedResponse(_)]));
    assert!(Arc::ptr_eq(&before, controller.route_progress().route()));
}

#[test]
fn refresh_suggests_a_faster_best_route() {
    let route = parse_first(&response(vec![route_json("", 1500.0, Some(("current", "sig-1")))]));
    let config = NavigationConfig {
        refreshes_route: true,
        ..NavigationConfig::default()
    };
    let mut controller = RouteController::new(route, config).unwrap();
    let mut log = Log::default();
    let before = Arc::clone(controller.route_progress().route());

    assert!(controller.update_location(fix(east(10.0), 90.0, 0), &mut log).is_empty());
    let commands = controller.update_location(fix(east(200.0), 90.0, 130), &mut log);
    let calls = sent(&commands);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, RequestKind::Refresh);
    assert_eq!(calls[0].request.body.as_deref(), Some(r#"{"mappy_signature":"sig-1"}"#));

    let ticket = calls[0].ticket;
    controller.apply_response(
        ticket,
        Ok(response(vec![route_json("", 900.0, Some(("best", "sig-best")))])),
        &mut log,
    );

    assert_eq!(log.faster, vec![900.0]);
    assert_eq!(log.refreshes, 0);
    assert!(Arc::ptr_eq(&before, controller.route_progress().route()));
}

#[test]
fn six_wrong_way_fixes_with_three_allowed_reroute_once() {
    let route = parse_first(&response(vec![route_json("", 1500.0, None)]));
    let config = NavigationConfig {
        min_number_of_incorrect_courses: 3,
        ..NavigationConfig::default()
    };
    let mut controller = RouteController::new(route, config).unwrap();
    let mut log = Log::default();

    let mut reroutes = Vec::new();
    for (i, along) in [600.0, 590.0, 580.0, 570.0, 560.0, 550.0].into_iter().enumerate() {
        let commands = controller.update_location(wrong_way(along, i as u64), &mut log);
        if sent(&commands).iter().any(|c| c.kind == RequestKind::Reroute) {
            reroutes.push(i);
        }
    }

    assert_eq!(reroutes, vec![3]);
    assert_eq!(controller.state(), NavigationState::Rerouting);
}

#[test]
fn fixes_within_the_tolerance_never_reroute() {
    let route = parse_first(&response(vec![route_json("", 1500.0, None)]));
    let mut controller = RouteController::new(route, NavigationConfig::default()).unwrap();
    let mut log = Log::default();

    for i in 0..10u64 {
        let along = 200.0 + 20.0 * i as f64;
        let off_line = geo::destination(&east(along), 40.0, 180.0);
        assert!(controller.update_location(fix(off_line, 90.0, i), &mut log).is_empty());
    }
    assert_eq!(controller.state(), NavigationState::Tracking);
    assert!(log.failures.is_empty());
}

#[test]
fn faster_route_check_prefers_the_most_similar_candidate() {
    let config = NavigationConfig {
        reroutes_proactively: true,
        ..NavigationConfig::default()
    };
    let route = parse_first(&response(vec![route_json("", 1500.0, None)]));
    let mut controller = RouteController::new(route, config).unwrap();
    let mut log = Log::default();

    assert!(controller.update_location(fix(east(10.0), 90.0, 0), &mut log).is_empty());
    let commands = controller.update_location(fix(east(200.0), 90.0, 130), &mut log);
    let calls = sent(&commands);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, RequestKind::ProactiveCheck);

    let ticket = calls[0].ticket;
    controller.apply_response(
        ticket,
        Ok(response(vec![
            route_json("Ring Road, Harbour Way", 800.0, None),
            route_json("", 900.0, None),
        ])),
        &mut log,
    );
    assert_eq!(log.reroutes, 1);
    assert_eq!(controller.route_progress().route().expected_travel_time, 900.0);
    assert_eq!(controller.route_progress().route().legs[0].summary, "");
}

//! Progress along a route: which leg, which step, how far along it,
//! and which instructions have already been delivered.
//!
//! A `RouteProgress` is built once per accepted route and replaced as a
//! whole when the route changes. Only the controller advances it.

use std::sync::Arc;

use serde::Serialize;

use crate::config::NavigationConfig;
use crate::error::{NavError, NavResult};
use crate::geo::{self, Coordinate};
use crate::location::LocationFix;
use crate::options::RoutingOptions;
use crate::route::{
    Intersection, Route, RouteLeg, RouteStep, SpokenInstruction, VisualInstruction, Waypoint,
};

/// Progress along a whole route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteProgress {
    route: Arc<Route>,
    leg_index: usize,
    pub current_leg_progress: LegProgress,
}

impl RouteProgress {
    /// Starts following `route` at the beginning of leg `leg_index`,
    /// with the first `spoken_instruction_index` announcements of its
    /// first step considered delivered.
    pub fn new(route: Arc<Route>, leg_index: usize, spoken_instruction_index: usize) -> NavResult<Self> {
        let leg = route
            .legs
            .get(leg_index)
            .cloned()
            .ok_or_else(|| NavError::InvalidRoute(format!("no leg {leg_index}")))?;
        let mut current_leg_progress = LegProgress::new(leg)?;
        current_leg_progress
            .current_step_progress
            .set_spoken_instruction_index(spoken_instruction_index);

        Ok(RouteProgress {
            route,
            leg_index,
            current_leg_progress,
        })
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn leg_index(&self) -> usize {
        self.leg_index
    }

    /// Moves to the start of another leg. Out-of-range indices are ignored.
    pub fn set_leg_index(&mut self, leg_index: usize) {
        let Some(leg) = self.route.legs.get(leg_index) else {
            log::debug!("ignoring leg index {leg_index} past the end of the route");
            return;
        };
        if let Ok(progress) = LegProgress::new(leg.clone()) {
            self.leg_index = leg_index;
            self.current_leg_progress = progress;
        }
    }

    pub fn current_leg(&self) -> &RouteLeg {
        &self.current_leg_progress.leg
    }

    pub fn remaining_legs(&self) -> &[RouteLeg] {
        self.route.legs.get(self.leg_index + 1..).unwrap_or(&[])
    }

    pub fn is_final_leg(&self) -> bool {
        self.leg_index + 1 >= self.route.legs.len()
    }

    pub fn distance_remaining(&self) -> f64 {
        self.current_leg_progress.distance_remaining()
            + self.remaining_legs().iter().map(|l| l.distance).sum::<f64>()
    }

    pub fn duration_remaining(&self) -> f64 {
        self.current_leg_progress.duration_remaining()
            + self
                .remaining_legs()
                .iter()
                .map(|l| l.expected_travel_time)
                .sum::<f64>()
    }

    pub fn distance_traveled(&self) -> f64 {
        (self.route.distance - self.distance_remaining()).max(0.0)
    }

    pub fn fraction_traveled(&self) -> f64 {
        if self.route.distance <= 0.0 {
            return 1.0;
        }
        (self.distance_traveled() / self.route.distance).clamp(0.0, 1.0)
    }

    /// Destinations still ahead: the current leg's and every later one.
    pub fn remaining_waypoints(&self) -> Vec<Waypoint> {
        self.route.legs[self.leg_index..]
            .iter()
            .map(|leg| leg.destination.clone())
            .collect()
    }

    /// Options for a fresh route from `fix` to the remaining destinations.
    ///
    /// The fix's course becomes the origin heading so the service does
    /// not route the traveller into a U-turn. The route signature is
    /// dropped: this asks for a new route, not an update of this one.
    pub fn rerouting_options(&self, fix: &LocationFix, config: &NavigationConfig) -> RoutingOptions {
        let heading = fix.has_qualified_course().then_some(fix.course);
        let origin = Waypoint {
            heading,
            heading_accuracy: heading.map(|_| config.rerouting_heading_accuracy),
            ..Waypoint::new(fix.coordinate)
        };

        let mut waypoints = vec![origin];
        waypoints.extend(self.remaining_waypoints());

        let mut options = self.route.options.with_waypoints(waypoints);
        options.route_signature = None;
        options.force_better_route = false;
        options
    }

    /// Options asking the service for an update of this exact route.
    pub fn refresh_options(&self, fix: &LocationFix, config: &NavigationConfig) -> RoutingOptions {
        let mut options = self.rerouting_options(fix, config);
        options.route_signature = self.route.signature().map(str::to_string);
        options
    }
}

/// Progress along the current leg.
#[derive(Debug, Clone, Serialize)]
pub struct LegProgress {
    leg: RouteLeg,
    step_index: usize,
    /// Set once the traveller reached this leg's destination.
    pub user_has_arrived: bool,
    pub current_step_progress: StepProgress,
}

impl LegProgress {
    pub fn new(leg: RouteLeg) -> NavResult<Self> {
        let first = leg
            .steps
            .first()
            .cloned()
            .ok_or_else(|| NavError::InvalidRoute("leg without steps".into()))?;
        Ok(LegProgress {
            leg,
            step_index: 0,
            user_has_arrived: false,
            current_step_progress: StepProgress::new(first),
        })
    }

    pub fn leg(&self) -> &RouteLeg {
        &self.leg
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Moves to the start of another step. Out-of-range indices are ignored.
    pub fn set_step_index(&mut self, step_index: usize) {
        if let Some(step) = self.leg.steps.get(step_index) {
            self.step_index = step_index;
            self.current_step_progress = StepProgress::new(step.clone());
        }
    }

    pub fn current_step(&self) -> &RouteStep {
        &self.current_step_progress.step
    }

    pub fn prior_step(&self) -> Option<&RouteStep> {
        self.step_index
            .checked_sub(1)
            .and_then(|i| self.leg.steps.get(i))
    }

    pub fn upcoming_step(&self) -> Option<&RouteStep> {
        self.leg.steps.get(self.step_index + 1)
    }

    /// Steps after the current one.
    pub fn remaining_steps(&self) -> &[RouteStep] {
        self.leg.steps.get(self.step_index + 1..).unwrap_or(&[])
    }

    /// First coordinate of the leg, where the traveller may go anywhere.
    pub fn leg_start(&self) -> Option<&Coordinate> {
        self.leg.steps.first().and_then(|s| s.coordinates.first())
    }

    pub fn distance_remaining(&self) -> f64 {
        self.current_step_progress.distance_remaining()
            + self.remaining_steps().iter().map(|s| s.distance).sum::<f64>()
    }

    pub fn duration_remaining(&self) -> f64 {
        self.current_step_progress.duration_remaining()
            + self
                .remaining_steps()
                .iter()
                .map(|s| s.expected_travel_time)
                .sum::<f64>()
    }

    /// Route geometry around the traveller: the previous, current and
    /// next step joined into one line.
    pub fn nearby_coordinates(&self) -> Vec<Coordinate> {
        let mut line: Vec<Coordinate> = Vec::new();
        let steps = self
            .prior_step()
            .into_iter()
            .chain(std::iter::once(self.current_step()))
            .chain(self.upcoming_step());
        for step in steps {
            for c in &step.coordinates {
                if line.last() != Some(c) {
                    line.push(*c);
                }
            }
        }
        line
    }

    /// Closest step to `coordinate` among the current and later steps,
    /// with its distance in meters. The earliest step wins ties.
    pub fn closest_step(&self, coordinate: &Coordinate) -> Option<(usize, f64)> {
        self.leg
            .steps
            .iter()
            .enumerate()
            .skip(self.step_index)
            .filter_map(|(i, step)| geo::distance_to_polyline(coordinate, &step.coordinates).map(|d| (i, d)))
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some(b) if b.1 <= candidate.1 => Some(b),
                _ => Some(candidate),
            })
    }
}

/// Progress along the current step.
#[derive(Debug, Clone, Serialize)]
pub struct StepProgress {
    step: RouteStep,
    /// Meters travelled along the step geometry.
    pub distance_traveled: f64,
    spoken_instruction_index: usize,
    visual_instruction_index: usize,
    intersection_index: usize,
    /// Distance from the step start to each intersection, in meters.
    intersection_distances: Vec<f64>,
    /// Meters to the next intersection, once known.
    pub user_distance_to_upcoming_intersection: Option<f64>,
    /// Straight-line distance to the upcoming maneuver on the last fix.
    pub user_distance_to_maneuver_location: f64,
}

impl StepProgress {
    pub fn new(step: RouteStep) -> Self {
        let intersection_distances = step
            .intersections
            .iter()
            .map(|i| {
                geo::project_on_polyline(&i.location, &step.coordinates)
                    .map(|p| p.distance_along_m)
                    .unwrap_or(0.0)
            })
            .collect();

        StepProgress {
            step,
            distance_traveled: 0.0,
            spoken_instruction_index: 0,
            visual_instruction_index: 0,
            intersection_index: 0,
            intersection_distances,
            user_distance_to_upcoming_intersection: None,
            user_distance_to_maneuver_location: f64::MAX,
        }
    }

    pub fn step(&self) -> &RouteStep {
        &self.step
    }

    pub fn distance_remaining(&self) -> f64 {
        (self.step.distance - self.distance_traveled).max(0.0)
    }

    pub fn fraction_traveled(&self) -> f64 {
        if self.step.distance <= 0.0 {
            return 1.0;
        }
        (self.distance_traveled / self.step.distance).clamp(0.0, 1.0)
    }

    pub fn duration_remaining(&self) -> f64 {
        (1.0 - self.fraction_traveled()) * self.step.expected_travel_time
    }

    pub fn spoken_instruction_index(&self) -> usize {
        self.spoken_instruction_index
    }

    /// Never moves past the instruction count of the step.
    pub fn set_spoken_instruction_index(&mut self, index: usize) {
        let count = self.step.spoken_instructions.as_ref().map_or(0, Vec::len);
        self.spoken_instruction_index = index.min(count);
    }

    pub fn visual_instruction_index(&self) -> usize {
        self.visual_instruction_index
    }

    pub fn set_visual_instruction_index(&mut self, index: usize) {
        let count = self.step.visual_instructions.as_ref().map_or(0, Vec::len);
        self.visual_instruction_index = index.min(count);
    }

    /// Announcements not yet delivered. None when the step carries no
    /// voice guidance at all.
    pub fn remaining_spoken_instructions(&self) -> Option<&[SpokenInstruction]> {
        self.step
            .spoken_instructions
            .as_deref()
            .map(|list| &list[self.spoken_instruction_index.min(list.len())..])
    }

    pub fn remaining_visual_instructions(&self) -> Option<&[VisualInstruction]> {
        self.step
            .visual_instructions
            .as_deref()
            .map(|list| &list[self.visual_instruction_index.min(list.len())..])
    }

    pub fn upcoming_spoken_instruction(&self) -> Option<&SpokenInstruction> {
        self.remaining_spoken_instructions()
            .and_then(|list| list.first())
    }

    pub fn upcoming_visual_instruction(&self) -> Option<&VisualInstruction> {
        self.remaining_visual_instructions()
            .and_then(|list| list.first())
    }

    pub fn intersection_index(&self) -> usize {
        self.intersection_index
    }

    pub fn intersection_distances(&self) -> &[f64] {
        &self.intersection_distances
    }

    pub fn upcoming_intersection(&self) -> Option<&Intersection> {
        self.step.intersections.get(self.intersection_index + 1)
    }

    /// Moves the intersection index to the last intersection already
    /// passed and refreshes the distance to the next one.
    pub fn update_intersections(&mut self) {
        let traveled = self.distance_traveled;
        if let Some(index) = self
            .intersection_distances
            .iter()
            .rposition(|&d| d <= traveled)
        {
            self.intersection_index = self.intersection_index.max(index);
        }
        self.user_distance_to_upcoming_intersection = self
            .intersection_distances
            .get(self.intersection_index + 1)
            .map(|d| (d - traveled).max(0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn progress() -> RouteProgress {
        RouteProgress::new(Arc::new(fixtures::l_shaped_route()), 0, 0).unwrap()
    }

    #[test]
    fn starts_at_first_step() {
        let p = progress();
        assert_eq!(p.leg_index(), 0);
        assert_eq!(p.current_leg_progress.step_index(), 0);
        assert_eq!(p.current_leg_progress.current_step().name, "First Street");
        assert_eq!(
            p.current_leg_progress.upcoming_step().map(|s| s.name.as_str()),
            Some("Second Street")
        );
        assert!(p.is_final_leg());
        assert!((p.duration_remaining() - 1500.0).abs() < 1e-6);
        assert_eq!(p.current_leg_progress.current_step_progress.user_distance_to_maneuver_location, f64::MAX);
    }

    #[test]
    fn rejects_missing_leg() {
        let err = RouteProgress::new(Arc::new(fixtures::l_shaped_route()), 3, 0).unwrap_err();
        assert!(matches!(err, NavError::InvalidRoute(_)));
    }

    #[test]
    fn spoken_index_is_clamped() {
        let p = RouteProgress::new(Arc::new(fixtures::l_shaped_route()), 0, 10).unwrap();
        let step = &p.current_leg_progress.current_step_progress;
        assert_eq!(step.spoken_instruction_index(), 3);
        assert_eq!(step.remaining_spoken_instructions().map(<[_]>::len), Some(0));
    }

    #[test]
    fn remaining_totals_follow_step_progress() {
        let mut p = progress();
        let step_distance = p.current_leg_progress.current_step().distance;
        p.current_leg_progress.current_step_progress.distance_traveled = step_distance / 2.0;

        assert!((p.current_leg_progress.current_step_progress.duration_remaining() - 450.0).abs() < 1e-6);
        assert!((p.duration_remaining() - 1050.0).abs() < 1e-6);
        assert!((p.distance_remaining() - (step_distance / 2.0 + 1000.0)).abs() < 1.0);
    }

    #[test]
    fn intersection_index_follows_distance() {
        let mut p = progress();
        let step = &mut p.current_leg_progress.current_step_progress;
        assert!((step.intersection_distances()[1] - 700.0).abs() < 1.0);

        step.distance_traveled = 500.0;
        step.update_intersections();
        assert_eq!(step.intersection_index(), 0);
        assert!((step.user_distance_to_upcoming_intersection.unwrap() - 200.0).abs() < 1.0);

        step.distance_traveled = 800.0;
        step.update_intersections();
        assert_eq!(step.intersection_index(), 1);
        assert_eq!(step.user_distance_to_upcoming_intersection, None);
    }

    #[test]
    fn closest_step_looks_ahead_only() {
        let mut p = progress();
        let on_second = fixtures::on_second_street(500.0);
        let (index, distance) = p.current_leg_progress.closest_step(&on_second).unwrap();
        assert_eq!(index, 1);
        assert!(distance < 1.0);

        p.current_leg_progress.set_step_index(2);
        let (index, _) = p.current_leg_progress.closest_step(&fixtures::on_first_street(10.0)).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn nearby_coordinates_join_steps() {
        let mut p = progress();
        assert_eq!(p.current_leg_progress.nearby_coordinates().len(), 4);
        p.current_leg_progress.set_step_index(1);
        // A, mid, B, C (duplicate arrival point collapsed).
        assert_eq!(p.current_leg_progress.nearby_coordinates().len(), 4);
    }

    #[test]
    fn rerouting_options_start_at_fix() {
        let p = progress();
        let config = NavigationConfig::default();
        let fix = fixtures::fix_at(fixtures::on_first_street(300.0), 95.0, 0);

        let options = p.rerouting_options(&fix, &config);
        assert_eq!(options.waypoints.len(), 2);
        assert_eq!(options.waypoints[0].heading, Some(95.0));
        assert_eq!(options.waypoints[0].heading_accuracy, Some(90.0));
        assert_eq!(options.waypoints[1].name.as_deref(), Some("Home"));
        assert!(options.route_signature.is_none());

        let unknown_course = LocationFix { course: -1.0, ..fix };
        let options = p.rerouting_options(&unknown_course, &config);
        assert_eq!(options.waypoints[0].heading, None);
        assert_eq!(options.waypoints[0].heading_accuracy, None);
    }

    #[test]
    fn refresh_options_keep_signature() {
        let route = fixtures::typed(fixtures::l_shaped_route(), crate::route::RouteType::Current, "sig-1");
        let p = RouteProgress::new(Arc::new(route), 0, 0).unwrap();
        let fix = fixtures::fix_at(fixtures::on_first_street(300.0), 90.0, 0);
        let options = p.refresh_options(&fix, &NavigationConfig::default());
        assert_eq!(options.route_signature.as_deref(), Some("sig-1"));
        assert!(options.body().is_some());
    }

    #[test]
    fn leg_index_moves_to_next_leg() {
        let mut p = RouteProgress::new(Arc::new(fixtures::two_leg_route()), 0, 0).unwrap();
        assert!(!p.is_final_leg());
        assert_eq!(p.remaining_waypoints().len(), 2);

        p.set_leg_index(1);
        assert_eq!(p.leg_index(), 1);
        assert!(p.is_final_leg());
        assert_eq!(p.current_leg().destination.name.as_deref(), Some("Home"));

        p.set_leg_index(5);
        assert_eq!(p.leg_index(), 1);
    }
}

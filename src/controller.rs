//! Route following and rerouting decisions.
//!
//! [`RouteController`] consumes location fixes and directions responses
//! and emits [`Command`]s telling its driver which directions requests
//! to send or cancel. It performs no I/O itself: the driver owns the
//! network and hands every response back through
//! [`RouteController::apply_response`], which keeps all progress
//! mutation on one serial path.

use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::config::NavigationConfig;
use crate::directions::{self, DirectionsResponse};
use crate::error::{NavError, NavResult};
use crate::events::NavigationObserver;
use crate::geo;
use crate::location::{Heading, LocationFix};
use crate::options::{DirectionsRequest, RoutingOptions};
use crate::progress::RouteProgress;
use crate::reconcile;
use crate::route::{Route, RouteStep, RouteType, Waypoint};

/// Coarse navigation state, mostly for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    /// No fix processed yet.
    Idle,
    Tracking,
    /// Confirmed away from the route, no reroute in flight.
    OffRoute,
    Rerouting,
    /// Reached the destination of the final leg.
    Arrived,
}

/// Identifies one directions request for the lifetime of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// New route after leaving the current one.
    Reroute,
    /// Speculative search for a faster route.
    ProactiveCheck,
    /// Update of a provider-typed route.
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsCall {
    pub ticket: Ticket,
    pub kind: RequestKind,
    pub request: DirectionsRequest,
}

/// Work for the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Command {
    Send(DirectionsCall),
    /// Abort the request with this ticket; its response will be ignored anyway.
    Cancel(Ticket),
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: Ticket,
    kind: RequestKind,
    options: RoutingOptions,
    forced: bool,
    duration_remaining: f64,
}

/// Follows one route at a time and decides when a new one is needed.
#[derive(Debug)]
pub struct RouteController {
    config: NavigationConfig,
    route_progress: RouteProgress,
    state: NavigationState,
    raw_location: Option<LocationFix>,
    location: Option<LocationFix>,
    heading: Option<Heading>,
    has_found_qualified_location: bool,
    incorrect_course_count: u32,
    last_reroute_location: Option<LocationFix>,
    last_proactive_check: Option<SystemTime>,
    last_refresh: Option<SystemTime>,
    previous_arrival_waypoint: Option<Waypoint>,
    force_proactive_reroute: bool,
    force_route_refresh: bool,
    next_ticket: u64,
    reroute_task: Option<InFlight>,
    check_task: Option<InFlight>,
}

impl RouteController {
    pub fn new(route: Route, config: NavigationConfig) -> NavResult<Self> {
        config.validate()?;
        let route_progress = RouteProgress::new(Arc::new(route), 0, 0)?;
        Ok(RouteController {
            config,
            route_progress,
            state: NavigationState::Idle,
            raw_location: None,
            location: None,
            heading: None,
            has_found_qualified_location: false,
            incorrect_course_count: 0,
            last_reroute_location: None,
            last_proactive_check: None,
            last_refresh: None,
            previous_arrival_waypoint: None,
            force_proactive_reroute: false,
            force_route_refresh: false,
            next_ticket: 1,
            reroute_task: None,
            check_task: None,
        })
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn route_progress(&self) -> &RouteProgress {
        &self.route_progress
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Last fix as delivered, including discarded ones.
    pub fn raw_location(&self) -> Option<&LocationFix> {
        self.raw_location.as_ref()
    }

    /// Last processed fix as it should be shown: snapped to the route
    /// when possible.
    pub fn location(&self) -> Option<&LocationFix> {
        self.location.as_ref()
    }

    pub fn is_rerouting(&self) -> bool {
        self.reroute_task.is_some()
    }

    /// Whether a proactive check or refresh is in flight.
    pub fn is_checking(&self) -> bool {
        self.check_task.is_some()
    }

    pub fn update_heading(&mut self, heading: Heading) {
        self.heading = Some(heading);
    }

    /// Runs the next eligible proactive check regardless of the interval,
    /// and accepts its result without comparing it to the current route.
    pub fn force_proactive_reroute_at_next_update(&mut self) {
        self.force_proactive_reroute = true;
    }

    /// Runs the next refresh regardless of the interval and applies its
    /// `current` route without the continuity check.
    pub fn force_route_refresh_at_next_update(&mut self) {
        self.force_route_refresh = true;
    }

    /// Processes one fix: updates progress, fires instruction and arrival
    /// events, and returns the directions requests to start or cancel.
    pub fn update_location(
        &mut self,
        fix: LocationFix,
        observer: &mut dyn NavigationObserver,
    ) -> Vec<Command> {
        if self.state == NavigationState::Idle {
            self.set_state(NavigationState::Tracking, observer);
        }
        self.raw_location = Some(fix);
        observer.raw_location_changed(&fix);

        match fix.check_quality(&self.config) {
            Ok(()) => self.has_found_qualified_location = true,
            Err(err) => {
                if self.has_found_qualified_location && observer.should_discard(&fix) {
                    log::debug!("discarding fix: {err}");
                    return Vec::new();
                }
            }
        }

        let fix = self.with_heading_course(fix);
        let shown = self.snapped_location(&fix);
        self.location = Some(shown);

        self.update_step_progress(&fix);
        observer.progress_changed(&self.route_progress, &shown);

        self.advance_step_if_needed(&fix);
        self.update_leg_progress(observer);
        self.update_visual_instruction_progress(&fix, observer);

        if !self.user_is_on_route(&fix, observer) {
            if self.reroute_task.is_none() {
                self.set_state(NavigationState::OffRoute, observer);
            }
            if observer.should_reroute_from(&fix) {
                return self.reroute(&fix, observer);
            }
            return Vec::new();
        }
        if self.state == NavigationState::OffRoute {
            self.set_state(NavigationState::Tracking, observer);
        }

        self.update_spoken_instruction_progress(&fix, observer);

        let command = if self.config.refreshes_route && self.route_progress.route().provider.is_some() {
            self.refresh_route(&fix, observer)
        } else {
            self.check_for_faster_route(&fix)
        };
        command.into_iter().collect()
    }

    /// Applies the outcome of a directions request issued earlier.
    /// Responses to requests that were cancelled or superseded are ignored.
    pub fn apply_response(
        &mut self,
        ticket: Ticket,
        body: NavResult<String>,
        observer: &mut dyn NavigationObserver,
    ) {
        let task = if self.reroute_task.as_ref().map(|t| t.ticket) == Some(ticket) {
            self.reroute_task.take()
        } else if self.check_task.as_ref().map(|t| t.ticket) == Some(ticket) {
            self.check_task.take()
        } else {
            None
        };
        let Some(task) = task else {
            log::debug!("ignoring response to {ticket:?}, no longer in flight");
            return;
        };

        let response = body.and_then(|json| directions::parse_response(&task.options, &json));
        match task.kind {
            RequestKind::Reroute => self.finish_reroute(response, observer),
            RequestKind::ProactiveCheck => self.finish_proactive_check(&task, response, observer),
            RequestKind::Refresh => self.finish_refresh(&task, response, observer),
        }
    }

    fn set_state(&mut self, state: NavigationState, observer: &mut dyn NavigationObserver) {
        if self.state != state {
            log::debug!("navigation state {:?} -> {:?}", self.state, state);
            self.state = state;
            observer.state_changed(state);
        }
    }

    /// Uses the device heading as course when the fix has none.
    fn with_heading_course(&self, fix: LocationFix) -> LocationFix {
        if fix.has_qualified_course() {
            return fix;
        }
        match self.heading {
            Some(heading) if heading.is_qualified() => fix.with_course(heading.true_heading),
            _ => fix,
        }
    }

    fn snapped_location(&self, fix: &LocationFix) -> LocationFix {
        let leg = &self.route_progress.current_leg_progress;
        fix.snapped_to(&leg.nearby_coordinates(), leg.leg_start(), &self.config)
            .unwrap_or(*fix)
    }

    /// Distance along the current step from the fix's projection to the
    /// step's end.
    fn snap_distance_to_maneuver(&self, fix: &LocationFix) -> f64 {
        let step = self.route_progress.current_leg_progress.current_step();
        geo::distance_to_end(&fix.coordinate, &step.coordinates).unwrap_or(0.0)
    }

    fn update_step_progress(&mut self, fix: &LocationFix) {
        let remaining = self.snap_distance_to_maneuver(fix);
        let step_progress = &mut self.route_progress.current_leg_progress.current_step_progress;
        step_progress.distance_traveled = (step_progress.step().distance - remaining).max(0.0);
        step_progress.update_intersections();
    }

    fn advance_step_if_needed(&mut self, fix: &LocationFix) {
        let snap_distance = self.snap_distance_to_maneuver(fix);
        let leg = &mut self.route_progress.current_leg_progress;
        let Some(upcoming) = leg.upcoming_step() else {
            return;
        };

        let distance_to_maneuver = geo::haversine(&fix.coordinate, &upcoming.maneuver_location);
        let last_distance = leg.current_step_progress.user_distance_to_maneuver_location;
        let course = fix.has_qualified_course().then_some(fix.course);
        let completed = completes_maneuver(
            snap_distance,
            course,
            upcoming,
            distance_to_maneuver,
            last_distance,
            &self.config,
        );

        leg.current_step_progress.user_distance_to_maneuver_location = distance_to_maneuver;
        if completed {
            let next = leg.step_index() + 1;
            log::debug!("completed maneuver, advancing to step {next}");
            leg.set_step_index(next);
        }
    }

    fn update_leg_progress(&mut self, observer: &mut dyn NavigationObserver) {
        let leg = &self.route_progress.current_leg_progress;
        let Some(remaining_spoken) = leg.current_step_progress.remaining_spoken_instructions() else {
            return;
        };
        let destination = &leg.leg().destination;
        if leg.remaining_steps().len() > 1
            || !remaining_spoken.is_empty()
            || self.previous_arrival_waypoint.as_ref() == Some(destination)
        {
            return;
        }

        let destination = destination.clone();
        log::info!(
            "arrived at {} (leg {})",
            destination.name.as_deref().unwrap_or("waypoint"),
            self.route_progress.leg_index()
        );
        self.previous_arrival_waypoint = Some(destination.clone());
        self.route_progress.current_leg_progress.user_has_arrived = true;

        let final_leg = self.route_progress.is_final_leg();
        if final_leg {
            self.set_state(NavigationState::Arrived, observer);
        }
        let advance = observer.did_arrive(&self.route_progress, &destination);
        if advance && !final_leg {
            let next = self.route_progress.leg_index() + 1;
            self.route_progress.set_leg_index(next);
        }
    }

    fn update_visual_instruction_progress(
        &mut self,
        fix: &LocationFix,
        observer: &mut dyn NavigationObserver,
    ) {
        let snap_distance = self.snap_distance_to_maneuver(fix);
        let leg = &mut self.route_progress.current_leg_progress;
        let first_on_leg = leg.step_index() == 0 && leg.current_step_progress.visual_instruction_index() == 0;
        let step_progress = &mut leg.current_step_progress;

        let Some(instruction) = step_progress.upcoming_visual_instruction() else {
            return;
        };
        if snap_distance <= instruction.distance_along_step || first_on_leg {
            let instruction = instruction.clone();
            let index = step_progress.visual_instruction_index();
            step_progress.set_visual_instruction_index(index + 1);
            observer.passed_visual_instruction(&self.route_progress, &instruction);
        }
    }

    fn update_spoken_instruction_progress(
        &mut self,
        fix: &LocationFix,
        observer: &mut dyn NavigationObserver,
    ) {
        let snap_distance = self.snap_distance_to_maneuver(fix);
        let leg = &mut self.route_progress.current_leg_progress;
        let first_on_leg = leg.step_index() == 0 && leg.current_step_progress.spoken_instruction_index() == 0;
        let step_progress = &mut leg.current_step_progress;

        let Some(instruction) = step_progress.upcoming_spoken_instruction() else {
            return;
        };
        if snap_distance <= instruction.distance_along_step || first_on_leg {
            let instruction = instruction.clone();
            let index = step_progress.spoken_instruction_index();
            step_progress.set_spoken_instruction_index(index + 1);
            observer.passed_spoken_instruction(&self.route_progress, &instruction);
        }
    }

    /// Allowed distance from the current step before a fix counts as away
    /// from it. Halved near intersections.
    fn rerouting_tolerance(&self, fix: &LocationFix) -> f64 {
        let leg = &self.route_progress.current_leg_progress;
        let near_intersection = leg
            .current_step()
            .intersections
            .iter()
            .chain(leg.upcoming_step().and_then(|s| s.intersections.first()))
            .any(|i| geo::haversine(&i.location, &fix.coordinate) < self.config.maneuver_zone_radius);

        if near_intersection {
            self.config.max_distance_before_recalculating / 2.0
        } else {
            self.config.max_distance_before_recalculating
        }
    }

    /// Whether the traveller is still following the route. May advance
    /// the step index when the fix lies on a later step.
    fn user_is_on_route(&mut self, fix: &LocationFix, observer: &mut dyn NavigationObserver) -> bool {
        let leg = &self.route_progress.current_leg_progress;
        if leg.user_has_arrived && observer.should_prevent_reroutes_when_arriving(&leg.leg().destination) {
            return true;
        }

        let radius = self.config.maneuver_zone_radius.max(self.rerouting_tolerance(fix));
        let close = geo::distance_to_polyline(&fix.coordinate, &leg.current_step().coordinates)
            .is_some_and(|d| d <= radius);
        if close && self.user_course_is_on_route(fix) {
            return true;
        }

        let leg = &mut self.route_progress.current_leg_progress;
        match leg.closest_step(&fix.coordinate) {
            Some((index, distance)) if distance < self.config.user_location_snapping_distance => {
                if index != leg.step_index() {
                    log::debug!("fix lies on step {index}, skipping ahead");
                    leg.set_step_index(index);
                }
                true
            }
            _ => false,
        }
    }

    /// Counts consecutive fixes whose course disagrees with the route.
    /// Returns false once the count reaches the allowance, which grows
    /// with the fix's inaccuracy.
    fn user_course_is_on_route(&mut self, fix: &LocationFix) -> bool {
        let leg = &self.route_progress.current_leg_progress;
        let Some(expected) = fix.interpolated_course(&leg.nearby_coordinates(), &self.config) else {
            return true;
        };

        let scaled = (fix.horizontal_accuracy / self.config.incorrect_course_multiplier).floor() as u32;
        let allowed = self.config.min_number_of_incorrect_courses.max(scaled);
        if self.incorrect_course_count >= allowed {
            return false;
        }

        let distance_to_leg_start = leg
            .leg_start()
            .map(|start| geo::haversine(start, &fix.coordinate))
            .unwrap_or(f64::MAX);
        if fix.course_agrees_with(expected, distance_to_leg_start, &self.config) {
            self.incorrect_course_count = 0;
        } else {
            self.incorrect_course_count += 1;
        }
        true
    }

    fn next_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn dispatch(&mut self, kind: RequestKind, options: RoutingOptions, forced: bool) -> Command {
        let ticket = self.next_ticket();
        let request = options.request();
        let task = InFlight {
            ticket,
            kind,
            options,
            forced,
            duration_remaining: self.route_progress.duration_remaining(),
        };
        match kind {
            RequestKind::Reroute => self.reroute_task = Some(task),
            RequestKind::ProactiveCheck | RequestKind::Refresh => self.check_task = Some(task),
        }
        log::debug!("sending {kind:?} request {ticket:?}");
        Command::Send(DirectionsCall { ticket, kind, request })
    }

    fn reroute(&mut self, fix: &LocationFix, observer: &mut dyn NavigationObserver) -> Vec<Command> {
        if let Some(last) = &self.last_reroute_location {
            if last.distance_to(fix) < self.config.max_distance_before_recalculating {
                return Vec::new();
            }
        }
        if self.reroute_task.is_some() {
            return Vec::new();
        }

        observer.will_reroute(&self.route_progress, fix);
        self.last_reroute_location = Some(*fix);
        self.set_state(NavigationState::Rerouting, observer);

        let mut commands = Vec::new();
        if let Some(task) = self.check_task.take() {
            log::debug!("cancelling {:?} request {:?} for reroute", task.kind, task.ticket);
            commands.push(Command::Cancel(task.ticket));
        }
        let options = self.route_progress.rerouting_options(fix, &self.config);
        commands.push(self.dispatch(RequestKind::Reroute, options, false));
        commands
    }

    fn finish_reroute(&mut self, response: NavResult<DirectionsResponse>, observer: &mut dyn NavigationObserver) {
        let progress = response.and_then(|response| {
            let route = pick_reroute(self.route_progress.route(), response)?;
            RouteProgress::new(Arc::new(route), 0, 0)
        });

        match progress {
            Ok(progress) => {
                log::info!("rerouted, new route takes {:.0} s", progress.route().expected_travel_time);
                self.route_progress = progress;
                self.incorrect_course_count = 0;
                self.set_state(NavigationState::Tracking, observer);
                observer.did_reroute(&self.route_progress, false);
            }
            Err(err) => {
                log::warn!("reroute failed: {err}");
                self.set_state(NavigationState::OffRoute, observer);
                observer.reroute_failed(&self.route_progress, &err);
            }
        }
    }

    fn check_for_faster_route(&mut self, fix: &LocationFix) -> Option<Command> {
        if !self.config.reroutes_proactively {
            return None;
        }
        let progress = &self.route_progress;
        let leg = &progress.current_leg_progress;
        if progress.duration_remaining() <= self.config.min_duration_remaining_for_proactive_rerouting
            || leg.current_step_progress.duration_remaining() <= self.config.medium_alert_interval
            || leg.upcoming_step().is_none()
        {
            return None;
        }

        let forced = self.force_proactive_reroute;
        if !interval_elapsed(&mut self.last_proactive_check, fix, &self.config, forced) {
            return None;
        }
        if self.reroute_task.is_some() || self.check_task.is_some() {
            return None;
        }

        self.force_proactive_reroute = false;
        let options = self.route_progress.rerouting_options(fix, &self.config);
        Some(self.dispatch(RequestKind::ProactiveCheck, options, forced))
    }

    fn finish_proactive_check(
        &mut self,
        task: &InFlight,
        response: NavResult<DirectionsResponse>,
        observer: &mut dyn NavigationObserver,
    ) {
        self.last_proactive_check = None;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                log::warn!("faster route check failed: {err}");
                return;
            }
        };

        let Some(upcoming) = self.route_progress.current_leg_progress.upcoming_step().cloned() else {
            return;
        };

        // Typed providers answer with the followed route and, maybe, a
        // faster one that is only ever suggested.
        let typed = response.is_typed();
        let (candidate, best) = if typed {
            (
                response.route_of_type(RouteType::Current).cloned(),
                response.route_of_type(RouteType::Best).cloned(),
            )
        } else {
            let mut routes = response.routes;
            let index = reconcile::most_similar(self.route_progress.route(), &routes);
            (index.map(|i| routes.swap_remove(i)), None)
        };

        match candidate {
            Some(route) => self.switch_to_faster_route(task, route, &upcoming, typed, observer),
            None => log::debug!("faster route check returned no route to follow"),
        }

        if let Some(best) = best {
            if self.suggests_faster_route(task, &best, &upcoming) {
                log::info!("faster route available ({:.0} s)", best.expected_travel_time);
                observer.faster_route_available(&self.route_progress, &best);
            }
        }
    }

    fn switch_to_faster_route(
        &mut self,
        task: &InFlight,
        route: Route,
        upcoming: &RouteStep,
        typed: bool,
        observer: &mut dyn NavigationObserver,
    ) {
        let substantial = route
            .first_step()
            .is_some_and(|s| s.expected_travel_time >= self.config.medium_alert_interval);
        let continuous = route.continues_with(upcoming);
        let faster = typed
            || route.expected_travel_time
                <= self.config.faster_route_duration_ratio * self.route_progress.duration_remaining();
        if !(task.forced || (substantial && continuous && faster)) {
            log::debug!(
                "keeping current route (substantial={substantial}, continuous={continuous}, faster={faster})"
            );
            return;
        }

        let spoken_index = self
            .route_progress
            .current_leg_progress
            .current_step_progress
            .spoken_instruction_index();
        match RouteProgress::new(Arc::new(route), 0, spoken_index) {
            Ok(progress) => {
                log::info!("switching to faster route ({:.0} s)", progress.route().expected_travel_time);
                self.route_progress = progress;
                observer.did_reroute(&self.route_progress, true);
            }
            Err(err) => log::warn!("faster route unusable: {err}"),
        }
    }

    fn refresh_route(&mut self, fix: &LocationFix, observer: &mut dyn NavigationObserver) -> Option<Command> {
        self.route_progress.current_leg_progress.upcoming_step()?;

        let forced = self.force_route_refresh;
        if !interval_elapsed(&mut self.last_refresh, fix, &self.config, forced) {
            return None;
        }
        if self.reroute_task.is_some() || self.check_task.is_some() {
            return None;
        }

        self.force_route_refresh = false;
        observer.will_refresh(&self.route_progress, fix);
        let options = self.route_progress.refresh_options(fix, &self.config);
        Some(self.dispatch(RequestKind::Refresh, options, forced))
    }

    fn finish_refresh(
        &mut self,
        task: &InFlight,
        response: NavResult<DirectionsResponse>,
        observer: &mut dyn NavigationObserver,
    ) {
        self.last_refresh = None;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                log::warn!("route refresh failed: {err}");
                return;
            }
        };
        let Some(upcoming) = self.route_progress.current_leg_progress.upcoming_step().cloned() else {
            return;
        };

        if let Some(current) = response.route_of_type(RouteType::Current) {
            if task.forced || current.continues_with(&upcoming) {
                match RouteProgress::new(Arc::new(current.clone()), 0, 0) {
                    Ok(progress) => {
                        log::info!("route refreshed, {:.0} s remaining", progress.duration_remaining());
                        self.route_progress = progress;
                        observer.did_refresh(&self.route_progress);
                    }
                    Err(err) => log::warn!("refreshed route unusable: {err}"),
                }
            } else {
                log::debug!("refreshed route no longer continues with the upcoming maneuver");
            }
        }

        if let Some(best) = response.route_of_type(RouteType::Best) {
            if self.suggests_faster_route(task, best, &upcoming) {
                log::info!("faster route available ({:.0} s)", best.expected_travel_time);
                observer.faster_route_available(&self.route_progress, best);
            }
        }
    }

    fn suggests_faster_route(&self, task: &InFlight, best: &Route, upcoming: &RouteStep) -> bool {
        task.duration_remaining > self.config.min_duration_remaining_for_proactive_rerouting
            && best
                .first_step()
                .is_some_and(|s| s.expected_travel_time >= self.config.medium_alert_interval)
            && best.continues_with(upcoming)
    }
}

/// Rate limit shared by proactive checks and refreshes. The first call
/// only starts the clock unless `forced`.
fn interval_elapsed(
    last: &mut Option<SystemTime>,
    fix: &LocationFix,
    config: &NavigationConfig,
    forced: bool,
) -> bool {
    match last {
        None => {
            *last = Some(fix.timestamp);
            forced
        }
        Some(since) => forced || fix.elapsed_since(*since) >= config.proactive_interval(),
    }
}

/// Route to follow after a reroute: the provider's `current` route when
/// it types its routes, else the candidate closest to the prior route.
fn pick_reroute(prior: &Route, response: DirectionsResponse) -> NavResult<Route> {
    let mut routes = response.routes;
    let index = if routes.iter().any(|r| r.provider.is_some()) {
        routes
            .iter()
            .position(|r| r.route_type() == Some(RouteType::Current))
            .or((!routes.is_empty()).then_some(0))
    } else {
        reconcile::most_similar(prior, &routes)
    };
    match index {
        Some(index) => Ok(routes.swap_remove(index)),
        None => Err(NavError::NoCandidateRoute),
    }
}

/// Whether the traveller completed the maneuver starting `upcoming`.
///
/// The fix must be within the maneuver zone of the step's end, and then
/// either travel in the maneuver's exit direction or be moving away
/// from the maneuver after having been inside the zone. Maneuvers that
/// barely turn use the wider straight-maneuver tolerance and also
/// complete once the fix projects onto the maneuver point.
pub fn completes_maneuver(
    snap_distance: f64,
    course: Option<f64>,
    upcoming: &RouteStep,
    distance_to_maneuver: f64,
    last_distance_to_maneuver: f64,
    config: &NavigationConfig,
) -> bool {
    if snap_distance > config.maneuver_zone_radius {
        return false;
    }

    let course_matches = match (upcoming.initial_heading, upcoming.final_heading) {
        (Some(initial), Some(exit)) => {
            let expected_turn_angle = geo::heading_difference(initial, exit);
            let within = |tolerance: f64| course.is_some_and(|c| geo::heading_difference(c, exit) <= tolerance);
            if expected_turn_angle <= config.max_degree_offset_for_turn_completion {
                snap_distance == 0.0 || within(config.straight_maneuver_degree_offset)
            } else {
                within(config.max_degree_offset_for_turn_completion)
            }
        }
        _ => false,
    };

    course_matches
        || (distance_to_maneuver > last_distance_to_maneuver
            && last_distance_to_maneuver <= config.maneuver_zone_radius)
}

//! Outbound notifications and decision hooks.
//!
//! The controller talks to the outside world through one
//! [`NavigationObserver`], passed by `&mut` on every call. Notification
//! methods default to no-ops; decision methods default to the values in
//! [`DefaultBehavior`].

use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::broadcast;

use crate::controller::NavigationState;
use crate::error::NavError;
use crate::location::LocationFix;
use crate::progress::RouteProgress;
use crate::route::{Route, SpokenInstruction, VisualInstruction, Waypoint};

/// Answers given by the decision hooks when an observer does not override them.
pub struct DefaultBehavior;

impl DefaultBehavior {
    /// Reroute once the traveller is confirmed off the route.
    pub const SHOULD_REROUTE: bool = true;
    /// Ignore low-quality fixes once a good one has been seen.
    pub const SHOULD_DISCARD_LOW_QUALITY: bool = true;
    /// Stop detecting deviations after arriving at a leg's destination.
    pub const PREVENTS_REROUTES_WHEN_ARRIVING: bool = true;
    /// Start the next leg right after arriving at an intermediate waypoint.
    pub const ADVANCES_TO_NEXT_LEG: bool = true;
}

impl NavigationObserver for DefaultBehavior {}

/// Callbacks invoked by [`RouteController`][crate::RouteController] while
/// it processes fixes and directions responses.
///
/// All methods have defaults, so implementors only override what they
/// care about. The observer only ever sees borrowed snapshots; it cannot
/// mutate the controller's progress.
pub trait NavigationObserver {
    /// Every accepted or discarded fix, before any filtering.
    fn raw_location_changed(&mut self, _location: &LocationFix) {}

    /// Progress was recomputed for `location` (snapped when possible).
    fn progress_changed(&mut self, _progress: &RouteProgress, _location: &LocationFix) {}

    fn state_changed(&mut self, _state: NavigationState) {}

    /// A reroute request is about to be sent from `location`.
    fn will_reroute(&mut self, _progress: &RouteProgress, _location: &LocationFix) {}

    /// The route was replaced. `proactive` tells a faster-route swap from
    /// a reroute after a deviation.
    fn did_reroute(&mut self, _progress: &RouteProgress, _proactive: bool) {}

    fn reroute_failed(&mut self, _progress: &RouteProgress, _error: &NavError) {}

    fn will_refresh(&mut self, _progress: &RouteProgress, _location: &LocationFix) {}

    fn did_refresh(&mut self, _progress: &RouteProgress) {}

    /// The service suggests `route` as a faster alternative. The followed
    /// route is unchanged.
    fn faster_route_available(&mut self, _progress: &RouteProgress, _route: &Route) {}

    fn passed_spoken_instruction(&mut self, _progress: &RouteProgress, _instruction: &SpokenInstruction) {}

    fn passed_visual_instruction(&mut self, _progress: &RouteProgress, _instruction: &VisualInstruction) {}

    /// The traveller reached `waypoint`. Returns whether to start the next
    /// leg right away; ignored on the final leg.
    fn did_arrive(&mut self, _progress: &RouteProgress, _waypoint: &Waypoint) -> bool {
        DefaultBehavior::ADVANCES_TO_NEXT_LEG
    }

    fn should_reroute_from(&mut self, _location: &LocationFix) -> bool {
        DefaultBehavior::SHOULD_REROUTE
    }

    /// Asked for every low-quality fix once a qualified fix has been seen.
    fn should_discard(&mut self, _location: &LocationFix) -> bool {
        DefaultBehavior::SHOULD_DISCARD_LOW_QUALITY
    }

    fn should_prevent_reroutes_when_arriving(&mut self, _waypoint: &Waypoint) -> bool {
        DefaultBehavior::PREVENTS_REROUTES_WHEN_ARRIVING
    }
}

/// Owned form of every notification, for consumers on other tasks.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavigationEvent {
    RawLocationChanged {
        location: LocationFix,
    },
    ProgressChanged {
        progress: RouteProgress,
        location: LocationFix,
    },
    StateChanged {
        state: NavigationState,
    },
    WillReroute {
        progress: RouteProgress,
        location: LocationFix,
    },
    DidReroute {
        progress: RouteProgress,
        proactive: bool,
    },
    RerouteFailed {
        progress: RouteProgress,
        #[serde(serialize_with = "error_message")]
        error: NavError,
    },
    WillRefresh {
        progress: RouteProgress,
        location: LocationFix,
    },
    DidRefresh {
        progress: RouteProgress,
    },
    FasterRouteAvailable {
        progress: RouteProgress,
        route: Arc<Route>,
    },
    PassedSpokenInstruction {
        progress: RouteProgress,
        instruction: SpokenInstruction,
    },
    PassedVisualInstruction {
        progress: RouteProgress,
        instruction: VisualInstruction,
    },
    Arrived {
        progress: RouteProgress,
        waypoint: Waypoint,
    },
}

fn error_message<S: Serializer>(error: &NavError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Observer that republishes every notification on a broadcast channel
/// and forwards decisions to `hooks`.
pub struct EventChannel<H = DefaultBehavior> {
    sender: broadcast::Sender<NavigationEvent>,
    hooks: H,
}

impl EventChannel<DefaultBehavior> {
    pub fn new(capacity: usize) -> Self {
        EventChannel::with_hooks(capacity, DefaultBehavior)
    }
}

impl<H: NavigationObserver> EventChannel<H> {
    pub fn with_hooks(capacity: usize, hooks: H) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventChannel { sender, hooks }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: NavigationEvent) {
        // Nobody listening is fine.
        let _ = self.sender.send(event);
    }
}

impl<H: NavigationObserver> NavigationObserver for EventChannel<H> {
    fn raw_location_changed(&mut self, location: &LocationFix) {
        self.hooks.raw_location_changed(location);
        self.publish(NavigationEvent::RawLocationChanged { location: *location });
    }

    fn progress_changed(&mut self, progress: &RouteProgress, location: &LocationFix) {
        self.hooks.progress_changed(progress, location);
        self.publish(NavigationEvent::ProgressChanged {
            progress: progress.clone(),
            location: *location,
        });
    }

    fn state_changed(&mut self, state: NavigationState) {
        self.hooks.state_changed(state);
        self.publish(NavigationEvent::StateChanged { state });
    }

    fn will_reroute(&mut self, progress: &RouteProgress, location: &LocationFix) {
        self.hooks.will_reroute(progress, location);
        self.publish(NavigationEvent::WillReroute {
            progress: progress.clone(),
            location: *location,
        });
    }

    fn did_reroute(&mut self, progress: &RouteProgress, proactive: bool) {
        self.hooks.did_reroute(progress, proactive);
        self.publish(NavigationEvent::DidReroute {
            progress: progress.clone(),
            proactive,
        });
    }

    fn reroute_failed(&mut self, progress: &RouteProgress, error: &NavError) {
        self.hooks.reroute_failed(progress, error);
        self.publish(NavigationEvent::RerouteFailed {
            progress: progress.clone(),
            error: error.clone(),
        });
    }

    fn will_refresh(&mut self, progress: &RouteProgress, location: &LocationFix) {
        self.hooks.will_refresh(progress, location);
        self.publish(NavigationEvent::WillRefresh {
            progress: progress.clone(),
            location: *location,
        });
    }

    fn did_refresh(&mut self, progress: &RouteProgress) {
        self.hooks.did_refresh(progress);
        self.publish(NavigationEvent::DidRefresh {
            progress: progress.clone(),
        });
    }

    fn faster_route_available(&mut self, progress: &RouteProgress, route: &Route) {
        self.hooks.faster_route_available(progress, route);
        self.publish(NavigationEvent::FasterRouteAvailable {
            progress: progress.clone(),
            route: Arc::new(route.clone()),
        });
    }

    fn passed_spoken_instruction(&mut self, progress: &RouteProgress, instruction: &SpokenInstruction) {
        self.hooks.passed_spoken_instruction(progress, instruction);
        self.publish(NavigationEvent::PassedSpokenInstruction {
            progress: progress.clone(),
            instruction: instruction.clone(),
        });
    }

    fn passed_visual_instruction(&mut self, progress: &RouteProgress, instruction: &VisualInstruction) {
        self.hooks.passed_visual_instruction(progress, instruction);
        self.publish(NavigationEvent::PassedVisualInstruction {
            progress: progress.clone(),
            instruction: instruction.clone(),
        });
    }

    fn did_arrive(&mut self, progress: &RouteProgress, waypoint: &Waypoint) -> bool {
        let advance = self.hooks.did_arrive(progress, waypoint);
        self.publish(NavigationEvent::Arrived {
            progress: progress.clone(),
            waypoint: waypoint.clone(),
        });
        advance
    }

    fn should_reroute_from(&mut self, location: &LocationFix) -> bool {
        self.hooks.should_reroute_from(location)
    }

    fn should_discard(&mut self, location: &LocationFix) -> bool {
        self.hooks.should_discard(location)
    }

    fn should_prevent_reroutes_when_arriving(&mut self, waypoint: &Waypoint) -> bool {
        self.hooks.should_prevent_reroutes_when_arriving(waypoint)
    }
}

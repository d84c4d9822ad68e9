//! Turn-by-turn route tracking.
//!
//! Feed location fixes to a [`RouteController`] and it tracks progress
//! along a [`Route`], fires spoken and visual instruction events, detects
//! when the traveller leaves the route, and asks for new routes from a
//! Mappy-style directions service. [`Navigator`] drives a controller on a
//! tokio task with an HTTP [`DirectionsService`].

pub mod client;
pub mod config;
pub mod controller;
pub mod directions;
pub mod error;
pub mod events;
pub mod geo;
pub mod location;
pub mod navigator;
pub mod options;
pub mod progress;
pub mod reconcile;
pub mod replay;
pub mod route;

#[cfg(test)]
mod fixtures;

pub use client::{DirectionsService, HttpDirections};
pub use config::NavigationConfig;
pub use controller::{Command, DirectionsCall, NavigationState, RequestKind, RouteController, Ticket};
pub use error::{NavError, NavResult};
pub use events::{DefaultBehavior, EventChannel, NavigationEvent, NavigationObserver};
pub use location::{Heading, LocationFix};
pub use navigator::{Navigator, NavigatorInput};
pub use options::RoutingOptions;
pub use route::{Route, RouteType, Waypoint};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

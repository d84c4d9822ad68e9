//! Tunable thresholds and feature flags for route following.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};

/// Thresholds used by the tracking and rerouting logic.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Radius in meters around a maneuver inside which step completion is evaluated.
    pub maneuver_zone_radius: f64,
    /// Distance in meters from the route beyond which a reroute is considered.
    /// Halved near intersections. Also the minimum distance between two reroutes.
    pub max_distance_before_recalculating: f64,
    /// Distance in meters within which a fix may be snapped to the route or to a future step.
    pub user_location_snapping_distance: f64,
    /// Allowed difference in degrees between the traveller's course and a maneuver's exit heading.
    pub max_degree_offset_for_turn_completion: f64,
    /// Same tolerance for maneuvers that barely change direction.
    pub straight_maneuver_degree_offset: f64,
    /// Allowed difference in degrees between the traveller's course and the route's direction.
    pub max_manipulated_course_angle: f64,
    /// Seconds before a maneuver during which no faster route is looked for.
    pub medium_alert_interval: f64,
    /// Seconds between two proactive checks or refreshes.
    pub proactive_rerouting_interval: f64,
    /// Proactive checks only run while more than this many seconds remain.
    pub min_duration_remaining_for_proactive_rerouting: f64,
    /// Lower bound on consecutive wrong-course fixes before going off-route.
    pub min_number_of_incorrect_courses: u32,
    /// Horizontal accuracy is divided by this to scale the wrong-course allowance.
    pub incorrect_course_multiplier: f64,
    /// Fixes with a worse horizontal accuracy (meters) are not used for progress.
    pub max_horizontal_accuracy: f64,
    /// Seconds of travel used to look around a fix when deriving the expected course.
    pub dead_reckoning_time_interval: f64,
    /// A proactively found route must take at most this share of the remaining duration.
    pub faster_route_duration_ratio: f64,
    /// Heading accuracy in degrees attached to the origin waypoint of a reroute.
    pub rerouting_heading_accuracy: f64,
    /// Look for faster routes while on route.
    pub reroutes_proactively: bool,
    /// Ask the service to refresh typed routes while on route.
    pub refreshes_route: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            maneuver_zone_radius: 40.0,
            max_distance_before_recalculating: 50.0,
            user_location_snapping_distance: 15.0,
            max_degree_offset_for_turn_completion: 30.0,
            straight_maneuver_degree_offset: 45.0,
            max_manipulated_course_angle: 45.0,
            medium_alert_interval: 70.0,
            proactive_rerouting_interval: 120.0,
            min_duration_remaining_for_proactive_rerouting: 600.0,
            min_number_of_incorrect_courses: 4,
            incorrect_course_multiplier: 4.0,
            max_horizontal_accuracy: 100.0,
            dead_reckoning_time_interval: 1.0,
            faster_route_duration_ratio: 0.9,
            rerouting_heading_accuracy: 90.0,
            reroutes_proactively: false,
            refreshes_route: false,
        }
    }
}

impl NavigationConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(json: &str) -> NavResult<Self> {
        let config: NavigationConfig =
            serde_json::from_str(json).map_err(|e| NavError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> NavResult<()> {
        let positive = [
            ("maneuver_zone_radius", self.maneuver_zone_radius),
            ("max_distance_before_recalculating", self.max_distance_before_recalculating),
            ("user_location_snapping_distance", self.user_location_snapping_distance),
            ("incorrect_course_multiplier", self.incorrect_course_multiplier),
            ("max_horizontal_accuracy", self.max_horizontal_accuracy),
            ("proactive_rerouting_interval", self.proactive_rerouting_interval),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(NavError::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }

        let angles = [
            ("max_degree_offset_for_turn_completion", self.max_degree_offset_for_turn_completion),
            ("straight_maneuver_degree_offset", self.straight_maneuver_degree_offset),
            ("max_manipulated_course_angle", self.max_manipulated_course_angle),
        ];
        for (name, value) in angles {
            if !(0.0..=180.0).contains(&value) {
                return Err(NavError::InvalidConfig(format!("{name} must be within 0..=180, got {value}")));
            }
        }

        if !(self.faster_route_duration_ratio > 0.0 && self.faster_route_duration_ratio <= 1.0) {
            return Err(NavError::InvalidConfig(format!(
                "faster_route_duration_ratio must be within (0, 1], got {}",
                self.faster_route_duration_ratio
            )));
        }

        Ok(())
    }

    pub fn proactive_interval(&self) -> Duration {
        Duration::from_secs_f64(self.proactive_rerouting_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NavigationConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.reroutes_proactively);
        assert_eq!(config.proactive_interval(), Duration::from_secs(120));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = NavigationConfig::from_json_str(
            r#"{"reroutes_proactively": true, "maneuver_zone_radius": 30}"#,
        )
        .unwrap();
        assert!(config.reroutes_proactively);
        assert_eq!(config.maneuver_zone_radius, 30.0);
        assert_eq!(config.max_distance_before_recalculating, 50.0);
    }

    #[test]
    fn rejects_nonsense_values() {
        let err = NavigationConfig::from_json_str(r#"{"maneuver_zone_radius": -1}"#).unwrap_err();
        assert!(matches!(err, NavError::InvalidConfig(_)));

        let err = NavigationConfig::from_json_str(r#"{"faster_route_duration_ratio": 1.5}"#).unwrap_err();
        assert!(matches!(err, NavError::InvalidConfig(_)));

        assert!(NavigationConfig::from_json_str("not json").is_err());
    }
}

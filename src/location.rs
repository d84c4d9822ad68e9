//! Location fixes and device headings as delivered by the platform.
//!
//! Negative course, speed and accuracy values follow the usual platform
//! convention of meaning "unknown".

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::config::NavigationConfig;
use crate::error::{NavError, NavResult};
use crate::geo::{self, Coordinate};

/// A single location fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    /// Direction of travel in degrees, negative when unknown.
    pub course: f64,
    /// Speed in m/s, negative when unknown.
    pub speed: f64,
    /// Radius of uncertainty of `coordinate` in meters, negative when invalid.
    pub horizontal_accuracy: f64,
    /// Altitude uncertainty in meters, negative when invalid.
    pub vertical_accuracy: f64,
    pub timestamp: SystemTime,
}

impl LocationFix {
    /// A fix with known position and accuracy but unknown course and speed.
    pub fn new(coordinate: Coordinate, horizontal_accuracy: f64, timestamp: SystemTime) -> Self {
        LocationFix {
            coordinate,
            course: -1.0,
            speed: -1.0,
            horizontal_accuracy,
            vertical_accuracy: -1.0,
            timestamp,
        }
    }

    pub fn with_course(mut self, course: f64) -> Self {
        self.course = course;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn has_qualified_course(&self) -> bool {
        is_qualified_direction(self.course)
    }

    /// Checks the fix against the quality filter.
    ///
    /// A fix qualifies when its horizontal accuracy is known and within
    /// `max_horizontal_accuracy`, and none of its measurements are NaN.
    /// Unknown (negative) course, speed or vertical accuracy do not
    /// disqualify a fix.
    pub fn check_quality(&self, config: &NavigationConfig) -> NavResult<()> {
        let finite = self.coordinate.lat.is_finite()
            && self.coordinate.lon.is_finite()
            && !self.course.is_nan()
            && !self.speed.is_nan()
            && !self.vertical_accuracy.is_nan();
        let accurate = (0.0..=config.max_horizontal_accuracy).contains(&self.horizontal_accuracy);

        if finite && accurate {
            Ok(())
        } else {
            Err(NavError::LowQualityLocation {
                horizontal_accuracy: self.horizontal_accuracy,
            })
        }
    }

    pub fn is_qualified(&self, config: &NavigationConfig) -> bool {
        self.check_quality(config).is_ok()
    }

    pub fn distance_to(&self, other: &LocationFix) -> f64 {
        geo::haversine(&self.coordinate, &other.coordinate)
    }

    /// Time elapsed since `earlier`, zero if the clock went backwards.
    pub fn elapsed_since(&self, earlier: SystemTime) -> Duration {
        self.timestamp
            .duration_since(earlier)
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the traveller's own course agrees with the course the
    /// route expects at this point.
    ///
    /// Near the start of a leg the traveller is allowed to go anywhere.
    pub fn course_agrees_with(
        &self,
        expected_course: f64,
        distance_to_leg_start: f64,
        config: &NavigationConfig,
    ) -> bool {
        if distance_to_leg_start < config.maneuver_zone_radius {
            return true;
        }
        self.has_qualified_course()
            && geo::heading_difference(self.course, expected_course)
                <= config.max_manipulated_course_angle
    }

    /// Snaps this fix onto `nearby`, the route geometry around the
    /// traveller. Returns None when the fix is too far from the line or
    /// its course disagrees with the line's direction.
    pub fn snapped_to(
        &self,
        nearby: &[Coordinate],
        leg_start: Option<&Coordinate>,
        config: &NavigationConfig,
    ) -> Option<LocationFix> {
        let closest = geo::project_on_polyline(&self.coordinate, nearby)?;
        let course = geo::interpolated_course(&self.coordinate, nearby, self.course_buffer(config))?;

        let distance_to_leg_start = leg_start
            .map(|start| geo::haversine(&self.coordinate, start))
            .unwrap_or(f64::MAX);
        if !self.course_agrees_with(course, distance_to_leg_start, config) {
            return None;
        }
        if closest.distance_m > config.user_location_snapping_distance + self.horizontal_accuracy.max(0.0) {
            return None;
        }

        Some(LocationFix {
            coordinate: closest.coordinate,
            course,
            ..*self
        })
    }

    /// Expected course at this fix's position along `line`.
    pub fn interpolated_course(&self, line: &[Coordinate], config: &NavigationConfig) -> Option<f64> {
        geo::interpolated_course(&self.coordinate, line, self.course_buffer(config))
    }

    /// Look-behind/look-ahead distance used to derive a course from the
    /// route geometry: half the distance covered in one dead-reckoning
    /// interval, never less than half the snapping distance.
    fn course_buffer(&self, config: &NavigationConfig) -> f64 {
        let travelled = self.speed.max(0.0) * config.dead_reckoning_time_interval;
        (travelled / 2.0).max(config.user_location_snapping_distance / 2.0)
    }
}

/// A compass heading from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading relative to true north in degrees, negative when invalid.
    pub true_heading: f64,
    /// Maximum deviation in degrees, negative when invalid.
    pub accuracy: f64,
}

impl Heading {
    pub fn is_qualified(&self) -> bool {
        is_qualified_direction(self.true_heading) && self.accuracy >= 0.0
    }
}

fn is_qualified_direction(direction: f64) -> bool {
    direction.is_finite() && direction >= 0.0
}

//! Location replay from recorded GPX tracks.
//!
//! Turns the track points of a GPX 1.1 file into [`LocationFix`]es so a
//! drive can be fed back through the controller in tests or demos.

use std::io::Read;
use std::time::{Duration, SystemTime};

use time::OffsetDateTime;

use crate::error::{NavError, NavResult};
use crate::geo::{self, Coordinate};
use crate::location::LocationFix;

/// Reads every track point of every track, in file order.
///
/// Points without a `<time>` are placed one second after their
/// predecessor. Course and speed are derived from the next point; the
/// last point repeats the previous course. `horizontal_accuracy` is
/// applied to every fix.
pub fn fixes_from_gpx<R: Read>(reader: R, horizontal_accuracy: f64) -> NavResult<Vec<LocationFix>> {
    let gpx = gpx::read(reader).map_err(|e| NavError::Replay(format!("GPX parse error: {e}")))?;

    let mut points: Vec<(Coordinate, Option<SystemTime>, Option<f64>)> = gpx
        .tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|seg| seg.points.iter())
        .map(|wp| {
            let time = wp.time.map(|t| SystemTime::from(OffsetDateTime::from(t)));
            (Coordinate::new(wp.point().y(), wp.point().x()), time, wp.speed)
        })
        .collect();

    if points.is_empty() {
        return Err(NavError::Replay("GPX file has no track points".into()));
    }

    let mut previous = SystemTime::UNIX_EPOCH;
    for (index, (_, time, _)) in points.iter_mut().enumerate() {
        let stamp = match *time {
            Some(t) => t,
            None if index == 0 => SystemTime::UNIX_EPOCH,
            None => previous + Duration::from_secs(1),
        };
        *time = Some(stamp);
        previous = stamp;
    }

    let mut fixes = Vec::with_capacity(points.len());
    let mut last_course = -1.0;
    for (index, (coordinate, time, recorded_speed)) in points.iter().enumerate() {
        let timestamp = time.unwrap_or(SystemTime::UNIX_EPOCH);
        let mut fix = LocationFix::new(*coordinate, horizontal_accuracy, timestamp);

        match points.get(index + 1) {
            Some((next, next_time, _)) => {
                let distance = geo::haversine(coordinate, next);
                if distance > 0.0 {
                    last_course = geo::bearing(coordinate, next);
                }
                let elapsed = next_time
                    .and_then(|t| t.duration_since(timestamp).ok())
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                if let Some(speed) = recorded_speed {
                    fix = fix.with_speed(*speed);
                } else if elapsed > 0.0 {
                    fix = fix.with_speed(distance / elapsed);
                }
            }
            None => {
                if let Some(speed) = recorded_speed {
                    fix = fix.with_speed(*speed);
                }
            }
        }
        if last_course >= 0.0 {
            fix = fix.with_course(last_course);
        }
        fixes.push(fix);
    }

    log::info!("replaying {} fixes", fixes.len());
    Ok(fixes)
}

//! Clock-time intervals and sunrise/sunset arithmetic used by automation.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::error::{ExtensionError, ExtensionResult};

/// Solar zenith for official sunrise/sunset (includes refraction and disc radius)
const ZENITH_DEG: f64 = 90.833_333_333_333_33;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Parse a "H:MM" / "HH:MM" clock time
pub fn parse_clock_time(value: &str) -> ExtensionResult<NaiveTime> {
    let invalid = || ExtensionError::InvalidTime(value.to_string());
    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Membership in `[start, end)`, wrapping past the end of the range when `start > end`.
/// An empty interval (`start == end`) contains nothing.
fn in_wrapping_interval<T: PartialOrd>(value: T, start: T, end: T) -> bool {
    if start < end {
        start <= value && value < end
    } else if start > end {
        value >= start || value < end
    } else {
        false
    }
}

pub fn is_in_time_interval(time: NaiveTime, activation: NaiveTime, deactivation: NaiveTime) -> bool {
    in_wrapping_interval(time, activation, deactivation)
}

/// Whether the local clock time of `now` falls in the activation interval
pub fn is_in_local_interval<Tz: TimeZone>(
    now: &DateTime<Tz>,
    activation: NaiveTime,
    deactivation: NaiveTime,
) -> bool {
    is_in_time_interval(now.time(), activation, deactivation)
}

/// Next instant strictly after `now` at which the local clock reads `time`
fn next_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, time: NaiveTime) -> DateTime<Utc> {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let today = now.date_naive();

    for offset in 0..=2 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            continue;
        };
        let naive = date.and_time(time);
        // Clock times skipped by a DST jump happen an hour later
        let local = tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest());
        if let Some(local) = local {
            let candidate = local.with_timezone(&Utc);
            if candidate > now_utc {
                return candidate;
            }
        }
    }

    now_utc + Duration::days(1)
}

/// The next instant at which interval membership flips, whichever boundary comes first
pub fn next_time_interval_boundary<Tz: TimeZone>(
    now: &DateTime<Tz>,
    activation: NaiveTime,
    deactivation: NaiveTime,
) -> DateTime<Utc> {
    let on = next_occurrence(now, activation);
    let off = next_occurrence(now, deactivation);
    on.min(off)
}

// ============================================================================
// Sun
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SunTimes {
    /// Polar day: the sun never sets on this date
    AlwaysDay,
    /// Polar night: the sun never rises on this date
    AlwaysNight,
    /// Seconds after UTC midnight
    Times { sunrise: u32, sunset: u32 },
}

enum SunEvent {
    At(f64),
    NeverRises,
    NeverSets,
}

fn normalize(value: f64, max: f64) -> f64 {
    let v = value % max;
    if v < 0.0 {
        v + max
    } else {
        v
    }
}

/// UTC hour of sunrise or sunset for the given day of the year
fn sun_event_utc_hours(latitude: f64, longitude: f64, day_of_year: u32, rising: bool) -> SunEvent {
    let lng_hour = longitude / 15.0;
    let t = day_of_year as f64 + ((if rising { 6.0 } else { 18.0 }) - lng_hour) / 24.0;

    let mean_anomaly = 0.9856 * t - 3.289;
    let true_longitude = normalize(
        mean_anomaly
            + 1.916 * mean_anomaly.to_radians().sin()
            + 0.020 * (2.0 * mean_anomaly).to_radians().sin()
            + 282.634,
        360.0,
    );

    let mut right_ascension = normalize(
        (0.91764 * true_longitude.to_radians().tan()).atan().to_degrees(),
        360.0,
    );
    let l_quadrant = (true_longitude / 90.0).floor() * 90.0;
    let ra_quadrant = (right_ascension / 90.0).floor() * 90.0;
    right_ascension = (right_ascension + l_quadrant - ra_quadrant) / 15.0;

    let sin_dec = 0.39782 * true_longitude.to_radians().sin();
    let cos_dec = sin_dec.asin().cos();
    let cos_h = (ZENITH_DEG.to_radians().cos() - sin_dec * latitude.to_radians().sin())
        / (cos_dec * latitude.to_radians().cos());

    if cos_h > 1.0 {
        return SunEvent::NeverRises;
    }
    if cos_h < -1.0 {
        return SunEvent::NeverSets;
    }

    let hour_angle = if rising {
        360.0 - cos_h.acos().to_degrees()
    } else {
        cos_h.acos().to_degrees()
    } / 15.0;

    let local_mean_time = hour_angle + right_ascension - 0.06571 * t - 6.622;
    SunEvent::At(normalize(local_mean_time - lng_hour, 24.0))
}

pub fn sun_times_utc(latitude: f64, longitude: f64, date: NaiveDate) -> SunTimes {
    use chrono::Datelike;

    let day = date.ordinal();
    let to_seconds = |hours: f64| ((hours * 3600.0).round() as u32).min(SECONDS_PER_DAY as u32 - 1);

    match (
        sun_event_utc_hours(latitude, longitude, day, true),
        sun_event_utc_hours(latitude, longitude, day, false),
    ) {
        (SunEvent::At(rise), SunEvent::At(set)) => SunTimes::Times {
            sunrise: to_seconds(rise),
            sunset: to_seconds(set),
        },
        (SunEvent::NeverRises, _) | (_, SunEvent::NeverRises) => SunTimes::AlwaysNight,
        _ => SunTimes::AlwaysDay,
    }
}

pub fn is_night_at(latitude: f64, longitude: f64, now: DateTime<Utc>) -> bool {
    match sun_times_utc(latitude, longitude, now.date_naive()) {
        SunTimes::AlwaysDay => false,
        SunTimes::AlwaysNight => true,
        SunTimes::Times { sunrise, sunset } => {
            in_wrapping_interval(now.num_seconds_from_midnight(), sunset, sunrise)
        }
    }
}

fn utc_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Next sunrise or sunset after `now`. During polar day/night, the next UTC midnight.
pub fn next_twilight_transition(latitude: f64, longitude: f64, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let dates = [today.pred_opt(), Some(today), today.succ_opt()];

    let next = dates
        .into_iter()
        .flatten()
        .filter_map(|date| match sun_times_utc(latitude, longitude, date) {
            SunTimes::Times { sunrise, sunset } => {
                let midnight = utc_midnight(date)?;
                Some([
                    midnight + Duration::seconds(sunrise as i64),
                    midnight + Duration::seconds(sunset as i64),
                ])
            }
            _ => None,
        })
        .flatten()
        .filter(|instant| *instant > now)
        .min();

    next.or_else(|| today.succ_opt().and_then(utc_midnight))
        .unwrap_or(now + Duration::days(1))
}

//! Automation policies: derive the enabled flag from settings and the clock.

use chrono::{DateTime, TimeZone, Utc};

use crate::settings::{Automation, AutomationBehaviour, ThemeMode, UserSettings};
use crate::time;

/// Name of the one-shot timer that re-runs the automation check
pub const AUTOMATION_ALARM: &str = "auto-time-alarm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutomationOutcome {
    /// `None` means no decision; the previous value stands
    pub is_enabled: Option<bool>,
    /// When the outcome could next change
    pub next_check: Option<DateTime<Utc>>,
    /// Theme mode to switch to, for the `Scheme` behaviour
    pub scheme: Option<ThemeMode>,
}

/// Evaluate the active automation policy at `now` (in the user's local zone).
///
/// `system_dark` is only consulted for `system` automation.
pub fn evaluate<Tz: TimeZone>(
    settings: &UserSettings,
    now: &DateTime<Tz>,
    system_dark: impl FnOnce() -> bool,
) -> AutomationOutcome {
    match settings.automation {
        Automation::None => AutomationOutcome {
            is_enabled: Some(settings.enabled),
            ..Default::default()
        },
        Automation::Time => {
            let parsed = time::parse_clock_time(&settings.time.activation).and_then(|on| {
                time::parse_clock_time(&settings.time.deactivation).map(|off| (on, off))
            });
            match parsed {
                Ok((on, off)) => AutomationOutcome {
                    is_enabled: Some(time::is_in_local_interval(now, on, off)),
                    next_check: Some(time::next_time_interval_boundary(now, on, off)),
                    scheme: None,
                },
                Err(e) => {
                    log::warn!("Time automation skipped: {}", e);
                    AutomationOutcome::default()
                }
            }
        }
        Automation::System => {
            let is_dark = system_dark();
            match settings.automation_behaviour {
                AutomationBehaviour::ToggleOnOff => AutomationOutcome {
                    is_enabled: Some(is_dark),
                    ..Default::default()
                },
                AutomationBehaviour::Scheme => AutomationOutcome {
                    is_enabled: Some(settings.enabled),
                    next_check: None,
                    scheme: Some(ThemeMode::from_dark(is_dark)),
                },
            }
        }
        Automation::Location => match settings.location.coordinates() {
            Some((latitude, longitude)) => {
                let now = now.with_timezone(&Utc);
                AutomationOutcome {
                    is_enabled: Some(time::is_night_at(latitude, longitude, now)),
                    next_check: Some(time::next_twilight_transition(latitude, longitude, now)),
                    scheme: None,
                }
            }
            None => {
                log::debug!("Location automation without coordinates, keeping previous state");
                AutomationOutcome::default()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{LocationSettings, TimeSettings};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, hour, minute, 0).unwrap()
    }

    fn time_settings() -> UserSettings {
        UserSettings {
            automation: Automation::Time,
            time: TimeSettings {
                activation: "22:00".to_string(),
                deactivation: "06:00".to_string(),
            },
            ..UserSettings::default()
        }
    }

    #[test]
    fn manual_mode_mirrors_enabled_without_schedule() {
        let settings = UserSettings {
            enabled: false,
            ..UserSettings::default()
        };
        let outcome = evaluate(&settings, &at(12, 0), || true);
        assert_eq!(outcome.is_enabled, Some(false));
        assert_eq!(outcome.next_check, None);
    }

    #[test]
    fn time_mode_enabled_overnight() {
        let settings = time_settings();
        let late = evaluate(&settings, &at(23, 30), || false);
        assert_eq!(late.is_enabled, Some(true));
        assert_eq!(
            late.next_check,
            Some(Utc.with_ymd_and_hms(2024, 3, 21, 6, 0, 0).unwrap())
        );
        assert_eq!(evaluate(&settings, &at(5, 30), || false).is_enabled, Some(true));
        assert_eq!(evaluate(&settings, &at(12, 0), || false).is_enabled, Some(false));
    }

    #[test]
    fn invalid_time_makes_no_decision() {
        let mut settings = time_settings();
        settings.time.activation = "late".to_string();
        assert_eq!(evaluate(&settings, &at(12, 0), || false), AutomationOutcome::default());
    }

    #[test]
    fn system_mode_follows_appearance() {
        let settings = UserSettings {
            automation: Automation::System,
            ..UserSettings::default()
        };
        assert_eq!(evaluate(&settings, &at(12, 0), || true).is_enabled, Some(true));
        assert_eq!(evaluate(&settings, &at(12, 0), || false).is_enabled, Some(false));
    }

    #[test]
    fn scheme_behaviour_keeps_enabled_and_reports_mode() {
        let settings = UserSettings {
            enabled: true,
            automation: Automation::System,
            automation_behaviour: AutomationBehaviour::Scheme,
            ..UserSettings::default()
        };
        let outcome = evaluate(&settings, &at(12, 0), || false);
        assert_eq!(outcome.is_enabled, Some(true));
        assert_eq!(outcome.scheme, Some(ThemeMode::Light));
    }

    #[test]
    fn location_requires_both_coordinates() {
        let mut settings = UserSettings {
            automation: Automation::Location,
            location: LocationSettings {
                latitude: Some(0.0),
                longitude: None,
            },
            ..UserSettings::default()
        };
        assert_eq!(evaluate(&settings, &at(0, 30), || false), AutomationOutcome::default());

        settings.location.longitude = Some(0.0);
        let outcome = evaluate(&settings, &at(0, 30), || false);
        assert_eq!(outcome.is_enabled, Some(true));
        assert!(outcome.next_check.is_some());
    }
}

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// When a job fires. Written in config as `hourly` or `daily@HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Trigger {
    Hourly,
    DailyAt(NaiveTime),
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("hourly") {
            return Ok(Self::Hourly);
        }
        match s.strip_prefix("daily@") {
            Some(hhmm) => NaiveTime::parse_from_str(hhmm, "%H:%M")
                .map(Self::DailyAt)
                .map_err(|e| format!("invalid daily time {hhmm:?}: {e}")),
            None => Err(format!(
                "unknown trigger {s:?}, expected \"hourly\" or \"daily@HH:MM\""
            )),
        }
    }
}

impl TryFrom<String> for Trigger {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => f.write_str("hourly"),
            Self::DailyAt(t) => write!(f, "daily@{}", t.format("%H:%M")),
        }
    }
}

impl Trigger {
    /// Next fire time.
    ///
    /// Hourly jobs fire one hour after `anchor` (the last run, or scheduler
    /// start). Daily jobs fire at the next HH:MM strictly after `now`.
    pub fn next_run(&self, anchor: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Hourly => anchor + Duration::hours(1),
            Self::DailyAt(time) => {
                let today = now.date().and_time(*time);
                if today > now {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn parse_triggers() {
        assert_eq!("hourly".parse::<Trigger>().unwrap(), Trigger::Hourly);
        assert_eq!(
            "daily@08:00".parse::<Trigger>().unwrap(),
            Trigger::DailyAt(NaiveTime::from_hms_opt(8, 0, 0).unwrap())
        );
        assert!("daily@25:00".parse::<Trigger>().is_err());
        assert!("weekly".parse::<Trigger>().is_err());
        assert!("daily@".parse::<Trigger>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["hourly", "daily@21:00", "daily@07:05"] {
            assert_eq!(s.parse::<Trigger>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn hourly_is_anchor_plus_one_hour() {
        let t = Trigger::Hourly;
        assert_eq!(
            t.next_run(at("2026-01-01 10:15:00"), at("2026-01-01 10:20:00")),
            at("2026-01-01 11:15:00")
        );
    }

    #[test]
    fn daily_is_strictly_after_now() {
        let t: Trigger = "daily@08:00".parse().unwrap();
        let anchor = at("2000-01-01 00:00:00");
        assert_eq!(
            t.next_run(anchor, at("2026-01-01 07:59:59")),
            at("2026-01-01 08:00:00")
        );
        assert_eq!(
            t.next_run(anchor, at("2026-01-01 08:00:00")),
            at("2026-01-02 08:00:00")
        );
        assert_eq!(
            t.next_run(anchor, at("2026-12-31 21:00:00")),
            at("2027-01-01 08:00:00")
        );
    }

    #[test]
    fn deserializes_from_string() {
        #[derive(Deserialize)]
        struct Job {
            trigger: Trigger,
        }
        let job: Job = toml::from_str(r#"trigger = "daily@21:00""#).unwrap();
        assert_eq!(job.trigger.to_string(), "daily@21:00");
        assert!(toml::from_str::<Job>(r#"trigger = "sometimes""#).is_err());
    }
}

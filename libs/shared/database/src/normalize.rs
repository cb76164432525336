//! The single adapter between loosely shaped schedule payloads and the typed model.
//!
//! Stored availability shows up in two shapes:
//!
//! * an array of per-day rows: `[{"day_of_week": 0, "is_available": true, "start_time": "09:00", ...}]`
//! * a profile object: `{"available_days": ["Monday", ...] | "Monday, Tuesday", "day_specific_data": {"monday": {...}}}`
//!
//! Everything downstream only ever sees seven `WeeklyRule`s.

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_models::scheduling::{
    parse_wall_clock, weekday_from_name, ScheduleException, WeeklyRule, DAYS_PER_WEEK, WEEKDAY_NAMES,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRules {
    /// Seven rules, Monday first.
    pub rules: Vec<WeeklyRule>,
    /// Weekdays whose stored hours were malformed and replaced by the default window.
    pub fallback_weekdays: Vec<u8>,
}

pub fn normalize_weekly_rules(raw: &Value, defaults: &SchedulingConfig) -> NormalizedRules {
    let mut builder = RuleBuilder::new(defaults);

    match raw {
        Value::Array(rows) => {
            for row in rows {
                builder.apply_row(row);
            }
        }
        Value::Object(profile) if profile.contains_key("available_days") || profile.contains_key("day_specific_data") => {
            builder.apply_profile(profile);
        }
        Value::Null => debug!("No stored weekly schedule, default-filling all days"),
        other => warn!("Unrecognised weekly schedule payload, default-filling all days: {}", other),
    }

    builder.finish()
}

struct RuleBuilder<'a> {
    defaults: &'a SchedulingConfig,
    rules: Vec<WeeklyRule>,
    fallback_weekdays: Vec<u8>,
}

impl<'a> RuleBuilder<'a> {
    fn new(defaults: &'a SchedulingConfig) -> Self {
        let rules = (0..DAYS_PER_WEEK)
            .map(|weekday| WeeklyRule::closed(weekday, defaults.default_day_start, defaults.default_day_end))
            .collect();
        Self { defaults, rules, fallback_weekdays: Vec::new() }
    }

    fn apply_row(&mut self, row: &Value) {
        let Some(weekday) = row_weekday(row) else {
            warn!("Skipping weekly rule row without a usable weekday: {}", row);
            return;
        };
        let is_available = row.get("is_available").and_then(Value::as_bool).unwrap_or(false);
        let (start_time, end_time) = self.window(weekday, is_available, row.get("start_time"), row.get("end_time"));

        self.rules[weekday as usize] = WeeklyRule::new(weekday, is_available, start_time, end_time);
    }

    fn apply_profile(&mut self, profile: &Map<String, Value>) {
        let available: Vec<u8> = match profile.get("available_days") {
            Some(Value::Array(days)) => days
                .iter()
                .filter_map(|day| match day {
                    Value::String(name) => weekday_from_name(name),
                    Value::Number(n) => n.as_u64().filter(|n| *n < DAYS_PER_WEEK as u64).map(|n| n as u8),
                    _ => None,
                })
                .collect(),
            Some(Value::String(joined)) => joined.split(',').filter_map(weekday_from_name).collect(),
            _ => Vec::new(),
        };

        let day_specific = profile.get("day_specific_data").and_then(Value::as_object);

        for weekday in 0..DAYS_PER_WEEK {
            let hours = day_specific.and_then(|data| {
                data.iter()
                    .find(|(name, _)| weekday_from_name(name) == Some(weekday))
                    .map(|(_, hours)| hours)
            });
            let is_available = available.contains(&weekday);
            let (start_time, end_time) = match hours {
                Some(hours) => self.window(weekday, is_available, hours.get("start_time"), hours.get("end_time")),
                None => (self.defaults.default_day_start, self.defaults.default_day_end),
            };
            self.rules[weekday as usize] = WeeklyRule::new(weekday, is_available, start_time, end_time);
        }
    }

    /// Only open days are reported when their hours fall back to the default window.
    fn window(
        &mut self,
        weekday: u8,
        is_available: bool,
        start: Option<&Value>,
        end: Option<&Value>,
    ) -> (NaiveTime, NaiveTime) {
        let start_time = start.and_then(time_value);
        let end_time = end.and_then(time_value);

        match (start_time, end_time) {
            (Some(start_time), Some(end_time)) if start_time < end_time => (start_time, end_time),
            _ if !is_available => {
                debug!("Closed {} has unusable hours, resetting to default", WEEKDAY_NAMES[weekday as usize]);
                (self.defaults.default_day_start, self.defaults.default_day_end)
            }
            _ => {
                warn!(
                    "Malformed hours for {} (start={:?}, end={:?}), using default {}-{}",
                    WEEKDAY_NAMES[weekday as usize],
                    start,
                    end,
                    self.defaults.default_day_start.format("%H:%M"),
                    self.defaults.default_day_end.format("%H:%M"),
                );
                if !self.fallback_weekdays.contains(&weekday) {
                    self.fallback_weekdays.push(weekday);
                }
                (self.defaults.default_day_start, self.defaults.default_day_end)
            }
        }
    }

    fn finish(self) -> NormalizedRules {
        NormalizedRules { rules: self.rules, fallback_weekdays: self.fallback_weekdays }
    }
}

fn row_weekday(row: &Value) -> Option<u8> {
    ["weekday", "day_of_week"]
        .iter()
        .filter_map(|key| row.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n.as_u64().filter(|n| *n < DAYS_PER_WEEK as u64).map(|n| n as u8),
            Value::String(s) => weekday_from_name(s),
            _ => None,
        })
        .or_else(|| row.get("day_name").and_then(Value::as_str).and_then(weekday_from_name))
}

fn time_value(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::String(s) => parse_wall_clock(s),
        Value::Number(n) => n.as_u64().and_then(|hour| NaiveTime::from_hms_opt(hour as u32, 0, 0)),
        _ => None,
    }
}

/// Decodes stored exception rows, tolerating `date`/`exception_date` and timestamp-shaped dates.
pub fn normalize_exceptions(raw: &Value, practitioner_id: Uuid) -> Vec<ScheduleException> {
    let Some(rows) = raw.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok());
            let date = row
                .get("exception_date")
                .or_else(|| row.get("date"))
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok());

            match (id, date) {
                (Some(id), Some(date)) => Some(ScheduleException {
                    id,
                    practitioner_id,
                    date,
                    is_available: row.get("is_available").and_then(Value::as_bool).unwrap_or(false),
                    reason: row.get("reason").and_then(Value::as_str).unwrap_or_default().to_string(),
                }),
                _ => {
                    warn!("Skipping malformed exception row: {}", row);
                    None
                }
            }
        })
        .collect()
}

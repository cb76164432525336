use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

use shared_config::SchedulingConfig;
use shared_models::scheduling::{format_wall_clock, parse_wall_clock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSlots {
    /// Candidate start times, earliest first.
    pub times: Vec<NaiveTime>,
    /// Set when the requested window was malformed and the default window was used instead.
    pub used_default_window: bool,
}

impl GeneratedSlots {
    pub fn labels(&self) -> Vec<String> {
        self.times.iter().map(|t| format_wall_clock(*t)).collect()
    }
}

/// Turns an opening window into candidate appointment start times.
#[derive(Debug, Clone)]
pub struct SlotGenerator {
    granularity: Duration,
    booking_lead: Duration,
    default_start: NaiveTime,
    default_end: NaiveTime,
}

impl SlotGenerator {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            granularity: Duration::minutes(config.slot_granularity_minutes.max(1) as i64),
            booking_lead: Duration::minutes(config.booking_lead_minutes as i64),
            default_start: config.default_day_start,
            default_end: config.default_day_end,
        }
    }

    /// Start times in `[start, end)` stepping by the granularity.
    ///
    /// On the same calendar day as `now`, only times strictly later than
    /// `now + booking lead` are produced. A window with `start >= end` is
    /// replaced by the default window.
    pub fn generate(
        &self,
        start: NaiveTime,
        end: NaiveTime,
        reference_date: NaiveDate,
        now: NaiveDateTime,
    ) -> GeneratedSlots {
        if start < end {
            return self.walk(start, end, reference_date, now, false);
        }

        warn!(
            "Malformed schedule window {}-{} for {}, using default {}-{}",
            format_wall_clock(start),
            format_wall_clock(end),
            reference_date,
            format_wall_clock(self.default_start),
            format_wall_clock(self.default_end),
        );
        self.walk(self.default_start, self.default_end, reference_date, now, true)
    }

    /// Same as [`generate`](Self::generate) for raw stored strings; missing or
    /// unparsable values fail closed to the default window.
    pub fn generate_raw(
        &self,
        start: Option<&str>,
        end: Option<&str>,
        reference_date: NaiveDate,
        now: NaiveDateTime,
    ) -> GeneratedSlots {
        match (start.and_then(parse_wall_clock), end.and_then(parse_wall_clock)) {
            (Some(start), Some(end)) => self.generate(start, end, reference_date, now),
            _ => {
                warn!(
                    "Unparsable schedule window {:?}-{:?} for {}, using default window",
                    start, end, reference_date
                );
                self.walk(self.default_start, self.default_end, reference_date, now, true)
            }
        }
    }

    fn walk(
        &self,
        start: NaiveTime,
        end: NaiveTime,
        reference_date: NaiveDate,
        now: NaiveDateTime,
        used_default_window: bool,
    ) -> GeneratedSlots {
        let earliest_bookable = (reference_date == now.date()).then(|| now + self.booking_lead);

        let end_at = reference_date.and_time(end);
        let mut current = reference_date.and_time(start);
        let mut times = Vec::new();

        while current < end_at {
            if earliest_bookable.map_or(true, |cutoff| current > cutoff) {
                times.push(current.time());
            }
            current += self.granularity;
        }

        GeneratedSlots { times, used_default_window }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn previous_sunday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn generator() -> SlotGenerator {
        SlotGenerator::new(&SchedulingConfig::default())
    }

    #[test]
    fn test_half_hour_steps_exclude_end() {
        let slots = generator().generate(t(9, 0), t(12, 0), monday(), previous_sunday_noon());
        assert_eq!(slots.labels(), vec!["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]);
        assert!(!slots.used_default_window);
    }

    #[test]
    fn test_same_day_applies_booking_lead() {
        let now = monday().and_hms_opt(9, 50, 0).unwrap();
        let slots = generator().generate(t(9, 0), t(12, 0), monday(), now);
        assert_eq!(slots.labels(), vec!["10:30", "11:00", "11:30"]);
    }

    #[test]
    fn test_slot_exactly_at_lead_cutoff_is_excluded() {
        let now = monday().and_hms_opt(9, 45, 0).unwrap();
        let slots = generator().generate(t(9, 0), t(11, 0), monday(), now);
        // cutoff is 10:00; the 10:00 slot is not strictly later
        assert_eq!(slots.labels(), vec!["10:30"]);
    }

    #[test]
    fn test_late_evening_leaves_nothing_for_today() {
        let now = monday().and_hms_opt(16, 50, 0).unwrap();
        let slots = generator().generate(t(9, 0), t(17, 0), monday(), now);
        assert!(slots.times.is_empty());
    }

    #[test]
    fn test_inverted_window_falls_back_to_default() {
        let slots = generator().generate(t(17, 0), t(9, 0), monday(), previous_sunday_noon());
        assert!(slots.used_default_window);
        assert_eq!(slots.times.first(), Some(&t(9, 0)));
        assert_eq!(slots.times.last(), Some(&t(16, 30)));
        assert_eq!(slots.times.len(), 16);
    }

    #[test]
    fn test_raw_window_unparsable_or_missing_falls_back() {
        let gen = generator();
        let garbage = gen.generate_raw(Some("noonish"), Some("17:00"), monday(), previous_sunday_noon());
        let missing = gen.generate_raw(None, None, monday(), previous_sunday_noon());

        assert!(garbage.used_default_window);
        assert!(missing.used_default_window);
        assert_eq!(garbage.times, missing.times);
        assert_eq!(garbage.times.len(), 16);
    }

    #[test]
    fn test_raw_window_accepts_seconds_and_bare_hours() {
        let slots = generator().generate_raw(Some("13:00:00"), Some("15"), monday(), previous_sunday_noon());
        assert_eq!(slots.labels(), vec!["13:00", "13:30", "14:00", "14:30"]);
    }

    #[test]
    fn test_window_reaching_midnight_does_not_wrap() {
        let config = SchedulingConfig {
            slot_granularity_minutes: 60,
            ..SchedulingConfig::default()
        };
        let slots = SlotGenerator::new(&config).generate(
            t(21, 0),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            monday(),
            previous_sunday_noon(),
        );
        assert_eq!(slots.labels(), vec!["21:00", "22:00", "23:00"]);
    }

    #[test]
    fn test_generation_is_restartable() {
        let gen = generator();
        let first = gen.generate(t(9, 0), t(12, 0), monday(), previous_sunday_noon());
        let second = gen.generate(t(9, 0), t(12, 0), monday(), previous_sunday_noon());
        assert_eq!(first, second);
    }
}

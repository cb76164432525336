use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which collaborator backs the schedule store and booking ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" | "in-memory" => Ok(StoreBackend::Memory),
            "supabase" | "postgrest" => Ok(StoreBackend::Supabase),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Global slot-computation knobs. These apply to every practitioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub slot_granularity_minutes: u32,
    pub booking_lead_minutes: u32,
    pub default_day_start: NaiveTime,
    pub default_day_end: NaiveTime,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: 30,
            booking_lead_minutes: 15,
            default_day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            default_day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let slot_granularity_minutes = parse_env("SLOT_GRANULARITY_MINUTES", defaults.slot_granularity_minutes)
            .filter(|minutes| *minutes > 0)
            .unwrap_or_else(|| {
                warn!("SLOT_GRANULARITY_MINUTES must be a positive integer, using default");
                defaults.slot_granularity_minutes
            });
        let booking_lead_minutes = parse_env("BOOKING_LEAD_MINUTES", defaults.booking_lead_minutes)
            .unwrap_or(defaults.booking_lead_minutes);
        let default_day_start = parse_time_env("DEFAULT_DAY_START", defaults.default_day_start);
        let default_day_end = parse_time_env("DEFAULT_DAY_END", defaults.default_day_end);

        if default_day_start >= default_day_end {
            warn!(
                "DEFAULT_DAY_START ({}) is not before DEFAULT_DAY_END ({}), using 09:00-17:00",
                default_day_start, default_day_end
            );
            return Self {
                slot_granularity_minutes,
                booking_lead_minutes,
                ..defaults
            };
        }

        Self {
            slot_granularity_minutes,
            booking_lead_minutes,
            default_day_start,
            default_day_end,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub store_backend: StoreBackend,
    pub api_port: u16,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            store_backend: env::var("SCHEDULING_STORE")
                .ok()
                .and_then(|raw| raw.parse().map_err(|e| warn!("{}, using in-memory store", e)).ok())
                .unwrap_or(StoreBackend::Memory),
            api_port: parse_env("API_PORT", 3000).unwrap_or_else(|| {
                warn!("API_PORT is not a valid port, using 3000");
                3000
            }),
            scheduling: SchedulingConfig::from_env(),
        };

        if config.store_backend == StoreBackend::Supabase && !config.is_configured() {
            warn!("Supabase store requested but not configured - falling back to in-memory store");
            config.store_backend = StoreBackend::Memory;
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

// Missing variables yield the default; present but unparsable ones yield None.
fn parse_env<T: FromStr>(key: &str, default: T) -> Option<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().ok(),
        Err(_) => Some(default),
    }
}

fn parse_time_env(key: &str, default: NaiveTime) -> NaiveTime {
    match env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{} must be HH:MM, got '{}', using {}", key, raw, default.format("%H:%M"));
            default
        }),
        Err(_) => default,
    }
}

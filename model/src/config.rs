//! Typed configuration for the production core.
//!
//! Mirrors the teacher's `AppConfig::from_env()` pattern: one struct, one
//! constructor that reads environment overrides and otherwise falls back to
//! the defaults this system has always shipped with.

/// The business window and oven/rack topology the core schedules against.
///
/// These never change at runtime (see Non-goals in the specification) but
/// are still threaded through explicitly rather than hard-coded so tests can
/// exercise alternate topologies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusinessHours {
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_minutes: 360,
            end_minutes: 1020,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OvenConfig {
    pub oven_count: u32,
    pub racks_per_oven: u32,
}

impl OvenConfig {
    pub fn total_racks(&self) -> u32 {
        self.oven_count * self.racks_per_oven
    }

    /// Oven a given 1-based rack position belongs to.
    pub fn oven_for_rack(&self, rack: u32) -> u32 {
        rack.div_ceil(self.racks_per_oven)
    }
}

impl Default for OvenConfig {
    fn default() -> Self {
        Self {
            oven_count: 2,
            racks_per_oven: 6,
        }
    }
}

/// Tunables used by the predictive/reactive suggestion engines (§6).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuggestionConfig {
    pub confidence_target_units: f64,
    pub reactive_window_minutes: u32,
    pub reactive_min_observed_units: f64,
    pub reactive_min_consumption_rate: f64,
    pub reactive_depletion_threshold_minutes: f64,
    pub reactive_target_buffer_minutes: f64,
    pub reactive_confidence_target_units: f64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            confidence_target_units: 50.0,
            reactive_window_minutes: 60,
            reactive_min_observed_units: 10.0,
            reactive_min_consumption_rate: 0.1,
            reactive_depletion_threshold_minutes: 90.0,
            reactive_target_buffer_minutes: 180.0,
            reactive_confidence_target_units: 30.0,
        }
    }
}

/// Top-level configuration for the production core and its ambient runner.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string for the optional SQLite-backed ScheduleStore mirror.
    pub database_url: String,

    pub business_hours: BusinessHours,
    pub oven: OvenConfig,

    /// Size, in minutes, of the grid all batch start times are aligned to.
    pub grid_minutes: u32,

    pub suggestion: SuggestionConfig,

    /// Real-time cadence of the simulation driver loop (ms). Per spec §5/§6: 100ms.
    pub driver_tick_ms: u64,

    /// Cadence of the simulation-registry sweeper (seconds). Per spec §5/§6: 600s.
    pub cleanup_interval_secs: u64,

    /// How long a stopped/completed simulation survives before eviction (seconds).
    /// Per spec §3/§5: 3600s (one hour).
    pub simulation_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://bakery_dev.db".to_string());

        Self {
            database_url,
            business_hours: BusinessHours::default(),
            oven: OvenConfig::default(),
            grid_minutes: 20,
            suggestion: SuggestionConfig::default(),
            driver_tick_ms: 100,
            cleanup_interval_secs: 600,
            simulation_ttl_secs: 3600,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use tracing::{info, warn};

use crate::model::parse_calendar_date;
use crate::placement::PlannerConfig;

/// Source of raw configuration values, keyed by variable name.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&env_string)
    }

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            api: ApiConfig::from_lookup(lookup),
            simulation: SimulationConfig::from_lookup(lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8000;
    const HOST_VAR: &'static str = "STOWAGE_API_HOST";
    const PORT_VAR: &'static str = "STOWAGE_API_PORT";

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let host_value = lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = load_with_warning(
            lookup,
            Self::PORT_VAR,
            Self::DEFAULT_PORT,
            |value| value != 0,
            "must not be 0",
        );

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Starting conditions and planner tunables.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    start_date: Date,
    seed_sample_data: bool,
    planner: PlannerConfig,
}

impl SimulationConfig {
    const START_DATE_VAR: &'static str = "STOWAGE_START_DATE";
    const SEED_VAR: &'static str = "STOWAGE_SEED_SAMPLE_DATA";
    const STACK_SPACING_VAR: &'static str = "STOWAGE_STACK_SPACING";
    const OVERLOAD_VAR: &'static str = "STOWAGE_OVERLOAD_THRESHOLD";
    const UNDERLOAD_VAR: &'static str = "STOWAGE_UNDERLOAD_THRESHOLD";
    const MAX_MOVES_VAR: &'static str = "STOWAGE_MAX_MOVES";
    const SPACE_PER_MOVE_VAR: &'static str = "STOWAGE_SPACE_PER_MOVE";
    const MINUTES_PER_MOVE_VAR: &'static str = "STOWAGE_MINUTES_PER_MOVE";

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let start_date = match lookup(Self::START_DATE_VAR) {
            Some(raw) => parse_calendar_date("startDate", &raw).unwrap_or_else(|err| {
                warn!("{} ignored: {}. Starting today.", Self::START_DATE_VAR, err);
                today_utc()
            }),
            None => today_utc(),
        };

        let seed_sample_data = lookup(Self::SEED_VAR)
            .and_then(|raw| parse_bool(&raw, Self::SEED_VAR))
            .unwrap_or(true);

        let stack_spacing = load_with_warning(
            lookup,
            Self::STACK_SPACING_VAR,
            PlannerConfig::DEFAULT_STACK_SPACING,
            |value: f64| value.is_finite() && value >= 0.0,
            "must be a non-negative number",
        );
        let overload_threshold = load_with_warning(
            lookup,
            Self::OVERLOAD_VAR,
            PlannerConfig::DEFAULT_OVERLOAD_THRESHOLD,
            |value| value <= 100,
            "must be between 0 and 100",
        );
        let underload_threshold = load_with_warning(
            lookup,
            Self::UNDERLOAD_VAR,
            PlannerConfig::DEFAULT_UNDERLOAD_THRESHOLD,
            |value| value <= 100,
            "must be between 0 and 100",
        );
        let max_moves = load_with_warning(
            lookup,
            Self::MAX_MOVES_VAR,
            PlannerConfig::DEFAULT_MAX_MOVES,
            |_| true,
            "must be a whole number",
        );
        let space_per_move = load_with_warning(
            lookup,
            Self::SPACE_PER_MOVE_VAR,
            PlannerConfig::DEFAULT_SPACE_PER_MOVE,
            |value: f64| value.is_finite() && value >= 0.0,
            "must be a non-negative number",
        );
        let minutes_per_move = load_with_warning(
            lookup,
            Self::MINUTES_PER_MOVE_VAR,
            PlannerConfig::DEFAULT_MINUTES_PER_MOVE,
            |_| true,
            "must be a whole number",
        );

        if underload_threshold >= overload_threshold {
            warn!(
                "{} ({}) is not below {} ({}); rearrangement plans will be empty.",
                Self::UNDERLOAD_VAR,
                underload_threshold,
                Self::OVERLOAD_VAR,
                overload_threshold
            );
        }

        let planner = PlannerConfig::builder()
            .stack_spacing(stack_spacing)
            .overload_threshold(overload_threshold)
            .underload_threshold(underload_threshold)
            .max_moves(max_moves)
            .space_per_move(space_per_move)
            .minutes_per_move(minutes_per_move)
            .build();

        Self {
            start_date,
            seed_sample_data,
            planner,
        }
    }

    /// Simulated date the station starts at.
    pub fn start_date(&self) -> Date {
        self.start_date
    }

    pub fn seed_sample_data(&self) -> bool {
        self.seed_sample_data
    }

    pub fn planner_config(&self) -> PlannerConfig {
        self.planner
    }
}

fn today_utc() -> Date {
    Timestamp::now().to_zoned(TimeZone::UTC).date()
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_with_warning<T>(
    lookup: Lookup<'_>,
    var_name: &str,
    default: T,
    validator: impl Fn(T) -> bool,
    invalid_hint: &str,
) -> T
where
    T: FromStr + Display + PartialEq + Copy,
    T::Err: Display,
{
    let Some(raw) = lookup(var_name) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) if validator(value) => {
            if value != default {
                info!("{} overrides default {} with {}.", var_name, default, value);
            }
            value
        }
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(&move |name: &str| vars.get(name).cloned())
    }

    #[test]
    fn seed_flag_spellings() {
        for raw in ["1", "TRUE", " yes ", "On"] {
            assert_eq!(parse_bool(raw, "STOWAGE_SEED_SAMPLE_DATA"), Some(true), "{raw}");
        }
        for raw in ["0", "False", " n ", "off"] {
            assert_eq!(parse_bool(raw, "STOWAGE_SEED_SAMPLE_DATA"), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("sometimes", "STOWAGE_SEED_SAMPLE_DATA"), None);
        assert_eq!(parse_bool("", "STOWAGE_SEED_SAMPLE_DATA"), None);
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = config_from(&[]);
        assert_eq!(config.api.port(), 8000);
        assert!(config.api.binds_to_all_interfaces());
        assert!(config.simulation.seed_sample_data());
        assert_eq!(config.simulation.planner_config(), PlannerConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            ("STOWAGE_API_HOST", "127.0.0.1"),
            ("STOWAGE_API_PORT", "9100"),
            ("STOWAGE_START_DATE", "2025-05-30"),
            ("STOWAGE_SEED_SAMPLE_DATA", "off"),
            ("STOWAGE_OVERLOAD_THRESHOLD", "80"),
            ("STOWAGE_MAX_MOVES", "5"),
        ]);
        assert_eq!(config.api.display_host(), "127.0.0.1");
        assert_eq!(config.api.socket_addr().port(), 9100);
        assert!(!config.api.binds_to_all_interfaces());
        assert_eq!(config.simulation.start_date(), jiff::civil::date(2025, 5, 30));
        assert!(!config.simulation.seed_sample_data());
        let planner = config.simulation.planner_config();
        assert_eq!(planner.overload_threshold, 80);
        assert_eq!(planner.max_moves, 5);
        assert_eq!(planner.underload_threshold, PlannerConfig::DEFAULT_UNDERLOAD_THRESHOLD);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("STOWAGE_API_HOST", "not-an-ip"),
            ("STOWAGE_API_PORT", "0"),
            ("STOWAGE_OVERLOAD_THRESHOLD", "250"),
            ("STOWAGE_STACK_SPACING", "-3"),
            ("STOWAGE_START_DATE", "yesterday"),
        ]);
        assert_eq!(config.api.display_host(), "0.0.0.0");
        assert_eq!(config.api.port(), 8000);
        let planner = config.simulation.planner_config();
        assert_eq!(planner.overload_threshold, PlannerConfig::DEFAULT_OVERLOAD_THRESHOLD);
        assert_eq!(planner.stack_spacing, PlannerConfig::DEFAULT_STACK_SPACING);
    }
}

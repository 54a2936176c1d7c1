use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_AVERAGE_CONSULTATION_MINUTES: u32 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_jwt_secret: String,
    pub bind_address: SocketAddr,
    /// Used by the queue wait estimate: `patients_ahead * average_consultation_minutes`.
    pub average_consultation_minutes: u32,
    /// Offset of the clinic's wall clock from UTC. Defines "today" and "now".
    pub clinic_utc_offset_minutes: i32,
    /// When set, calling the next patient also starts the consultation.
    pub auto_start_on_call: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_jwt_secret: String::new(),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            average_consultation_minutes: DEFAULT_AVERAGE_CONSULTATION_MINUTES,
            clinic_utc_offset_minutes: 0,
            auto_start_on_call: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            bind_address: parse_var("BIND_ADDRESS", DEFAULT_BIND_ADDRESS, defaults.bind_address),
            average_consultation_minutes: parse_var(
                "AVERAGE_CONSULTATION_MINUTES",
                "15",
                defaults.average_consultation_minutes,
            ),
            clinic_utc_offset_minutes: parse_var(
                "CLINIC_UTC_OFFSET_MINUTES",
                "0",
                defaults.clinic_utc_offset_minutes,
            ),
            auto_start_on_call: parse_var("AUTO_START_ON_CALL", "false", defaults.auto_start_on_call),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_var<T: FromStr>(key: &str, shown_default: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, shown_default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, shown_default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_env() {
        let config = AppConfig::default();
        assert_eq!(config.average_consultation_minutes, 15);
        assert_eq!(config.bind_address.port(), 3000);
        assert!(!config.auto_start_on_call);
        assert!(!config.is_configured());
    }

    #[test]
    fn parse_var_falls_back_on_garbage() {
        env::set_var("CLINIC_QUEUE_TEST_GARBAGE", "not-a-number");
        let value: u32 = parse_var("CLINIC_QUEUE_TEST_GARBAGE", "7", 7);
        assert_eq!(value, 7);
        env::remove_var("CLINIC_QUEUE_TEST_GARBAGE");
    }
}

use std::env;
use std::str::FromStr;

use chrono::{NaiveTime, Weekday};
use dotenvy::dotenv;

use crate::engine::ShiftPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Shift policy applied to every reconciled day
    pub shift_start: NaiveTime,
    pub expected_shift_hours: f64,
    pub grace_minutes: i64,
    pub rest_days: Vec<Weekday>,

    /// Row errors surfaced per import summary; the rest are only counted.
    pub max_surfaced_errors: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            shift_start: {
                let raw = env::var("SHIFT_START").unwrap_or_else(|_| "08:00".to_string());
                NaiveTime::parse_from_str(&raw, "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
                    .expect("SHIFT_START must be HH:MM")
            },
            expected_shift_hours: env::var("SHIFT_HOURS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .expect("SHIFT_HOURS must be numeric"),
            grace_minutes: env::var("GRACE_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("GRACE_MINUTES must be numeric"),
            rest_days: parse_rest_days(
                &env::var("REST_DAYS").unwrap_or_else(|_| "Sat,Sun".to_string()),
            ),

            max_surfaced_errors: env::var("MAX_SURFACED_ERRORS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("MAX_SURFACED_ERRORS must be numeric"),
        }
    }

    pub fn shift_policy(&self) -> ShiftPolicy {
        ShiftPolicy {
            shift_start: self.shift_start,
            expected_hours: self.expected_shift_hours,
            grace_minutes: self.grace_minutes,
            rest_days: self.rest_days.clone(),
        }
    }
}

fn parse_rest_days(raw: &str) -> Vec<Weekday> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| Weekday::from_str(s.trim()).expect("REST_DAYS must be weekday names"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_days_parse_short_names() {
        assert_eq!(parse_rest_days("Sat,Sun"), vec![Weekday::Sat, Weekday::Sun]);
        assert_eq!(parse_rest_days("sunday"), vec![Weekday::Sun]);
        assert!(parse_rest_days("").is_empty());
    }
}

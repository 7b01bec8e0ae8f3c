use std::{env, fmt::Display, str::FromStr};

use anyhow::Context;
use tracing::info;

pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        Ok(Self {
            database_url,
            port: try_load("ATTENDANCE_PORT", 8080)?,
            max_connections: try_load("ATTENDANCE_MAX_CONNECTIONS", 5)?,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid {key} value {value:?}")),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_falls_back_to_default() {
        let port: u16 = try_load("ATTENDANCE_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn malformed_variable_is_rejected() {
        env::set_var("ATTENDANCE_TEST_BAD_PORT", "eighty");
        let result: anyhow::Result<u16> = try_load("ATTENDANCE_TEST_BAD_PORT", 8080);
        assert!(result.is_err());
        env::set_var("ATTENDANCE_TEST_GOOD_PORT", " 9090 ");
        let port: u16 = try_load("ATTENDANCE_TEST_GOOD_PORT", 8080).unwrap();
        assert_eq!(port, 9090);
    }
}

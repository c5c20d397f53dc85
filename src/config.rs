use std::env;

use chrono::NaiveTime;
use dotenvy::dotenv;

use crate::{
    booking::ClientPolicy,
    slots::{parse_time, SlotCatalog},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub slots: SlotCatalog,
    pub client_policy: ClientPolicy,
    pub seed: SeedAccount,
}

#[derive(Debug, Clone)]
pub struct SeedAccount {
    pub username: String,
    pub password: String,
    pub barber_name: String,
}

pub const DEFAULT_SEED_PASSWORD: &str = "password123";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let start = vars.time("SLOT_START", "09:00")?;
        let end = vars.time("SLOT_END", "16:30")?;
        let step = vars.parse::<u32>("SLOT_STEP_MINUTES", 30)?;
        let slots = SlotCatalog::new(start, end, step).map_err(|reason| ConfigError::Invalid {
            name: "SLOT_*",
            reason,
        })?;

        let client_policy = match vars.get_or("CLIENT_POLICY", "reuse").trim() {
            "reuse" => ClientPolicy::ReuseByEmail,
            "always_new" => ClientPolicy::AlwaysNew,
            other => {
                return Err(ConfigError::Invalid {
                    name: "CLIENT_POLICY",
                    reason: format!("expected 'reuse' or 'always_new', got '{other}'"),
                })
            }
        };

        Ok(Self {
            database_url: vars.get_or("DATABASE_URL", "sqlite://./data/barber.db"),
            port: vars.parse("PORT", 8080)?,
            slots,
            client_policy,
            seed: SeedAccount {
                username: vars.get_or("SEED_USERNAME", "barber1"),
                password: vars.get_or("SEED_PASSWORD", DEFAULT_SEED_PASSWORD),
                barber_name: vars.get_or("SEED_BARBER_NAME", "John"),
            },
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get_or(&self, name: &str, default: &str) -> String {
        (self.0)(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(name) {
            Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                name,
                reason: err.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn time(&self, name: &'static str, default: &str) -> Result<NaiveTime, ConfigError> {
        let raw = self.get_or(name, default);
        parse_time(&raw).ok_or_else(|| ConfigError::Invalid {
            name,
            reason: format!("expected HH:MM, got '{raw}'"),
        })
    }
}

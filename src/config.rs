use chrono::Utc;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::error::{LoadTestError, Result};

/// Optional file read before the environment; env values win.
pub const CONFIG_FILE: &str = "loadtest.toml";

/// Env keys read through figment's `Env` parser (integers and flags).
pub const TYPED_ENV_KEYS: &[&str] = &[
    "VUS",
    "USER_COUNT",
    "SEED_USERS",
    "SKIP_REGISTER",
    "ALLOW_OVERLOAD",
];

/// Env keys taken byte-for-byte: `RUN_ID=007` stays `007`.
pub const VERBATIM_ENV_KEYS: &[&str] = &[
    "DURATION",
    "BASE_URL",
    "TEST_PASSWORD",
    "RUN_ID",
    "HTTP_TIMEOUT",
    "SUMMARY_EXPORT",
    "LOG_FORMAT",
];

pub const DEFAULT_VUS: usize = 50;
pub const DEFAULT_DURATION: &str = "2m";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_TEST_PASSWORD: &str = "Password123!";
pub const DEFAULT_USER_COUNT: usize = 50;
/// Upper bound of the default seed size; registration is expensive on the target.
pub const DEFAULT_SEED_CAP: usize = 20;
pub const DEFAULT_HTTP_TIMEOUT: &str = "60s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Fully resolved run configuration. Defaults are applied once, here.
#[derive(Debug, Clone)]
pub struct Config {
    pub vus: usize,
    pub duration: Duration,
    pub base_url: String,
    pub test_password: String,
    pub user_count: usize,
    pub seed_users: usize,
    pub skip_register: bool,
    pub allow_overload: bool,
    pub run_id: String,
    pub http_timeout: Duration,
    pub summary_export: Option<PathBuf>,
    pub log_format: LogFormat,
}

/// Values as they arrive from figment, before defaulting.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    #[serde(deserialize_with = "lenient::number")]
    vus: Option<usize>,
    #[serde(deserialize_with = "lenient::string")]
    duration: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    base_url: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    test_password: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    user_count: Option<usize>,
    #[serde(deserialize_with = "lenient::number")]
    seed_users: Option<usize>,
    #[serde(deserialize_with = "lenient::flag")]
    skip_register: bool,
    #[serde(deserialize_with = "lenient::flag")]
    allow_overload: bool,
    #[serde(deserialize_with = "lenient::string")]
    run_id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    http_timeout: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    summary_export: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    log_format: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// `loadtest.toml` overlaid by the environment.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(TYPED_ENV_KEYS))
            .merge(Serialized::defaults(verbatim_env(VERBATIM_ENV_KEYS)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let raw: RawConfig = figment.extract()?;
        raw.resolve()
    }
}

impl RawConfig {
    fn resolve(self) -> Result<Config> {
        let vus = self.vus.unwrap_or(DEFAULT_VUS);
        if vus == 0 {
            return Err(LoadTestError::InvalidOption {
                key: "VUS",
                reason: "at least one virtual user is required".into(),
            });
        }

        let user_count = self.user_count.unwrap_or(DEFAULT_USER_COUNT);
        let seed_users = self
            .seed_users
            .unwrap_or_else(|| user_count.min(DEFAULT_SEED_CAP));
        if seed_users == 0 {
            return Err(LoadTestError::InvalidOption {
                key: "SEED_USERS",
                reason: "the user pool cannot be empty".into(),
            });
        }

        let duration = parse_duration(
            "DURATION",
            self.duration.as_deref().unwrap_or(DEFAULT_DURATION),
        )?;
        let http_timeout = parse_duration(
            "HTTP_TIMEOUT",
            self.http_timeout.as_deref().unwrap_or(DEFAULT_HTTP_TIMEOUT),
        )?;

        let log_format = match self.log_format {
            Some(raw) => raw.parse().map_err(|_| LoadTestError::InvalidOption {
                key: "LOG_FORMAT",
                reason: format!("expected 'json' or 'pretty', got '{raw}'"),
            })?,
            None => LogFormat::default(),
        };

        Ok(Config {
            vus,
            duration,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            test_password: self
                .test_password
                .unwrap_or_else(|| DEFAULT_TEST_PASSWORD.to_string()),
            user_count,
            seed_users,
            skip_register: self.skip_register,
            allow_overload: self.allow_overload,
            run_id: self
                .run_id
                .unwrap_or_else(|| Utc::now().timestamp_millis().to_string()),
            http_timeout,
            summary_export: self.summary_export.map(PathBuf::from),
            log_format,
        })
    }
}

/// Env values for `keys` as plain strings, keyed like `Env::raw` (lowercase).
fn verbatim_env(keys: &[&str]) -> BTreeMap<String, String> {
    keys.iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .map(|value| (key.to_ascii_lowercase(), value))
        })
        .collect()
}

fn parse_duration(key: &'static str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|source| LoadTestError::InvalidDuration {
        key,
        value: value.to_string(),
        source,
    })
}

/// TOML and figment's `Env` parser hand over typed values, so `vus = "12"`
/// arrives as a string and `SKIP_REGISTER=true` as a bool. These accept
/// either form. Empty strings count as unset.
mod lenient {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    struct Text;

    impl<'de> Visitor<'de> for Text {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = d.deserialize_any(Text)?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
        match string(d)? {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("'{raw}' is not a non-negative integer"))),
            None => Ok(None),
        }
    }

    /// Only `1` and `true` (any case) enable a flag.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(string(d)?
            .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
            .unwrap_or(false))
    }
}

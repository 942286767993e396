use std::collections::HashSet;

use crate::error::ConfigError;

const DEFAULT_GROUP_CAPACITY: u32 = 20;
const DEFAULT_MAX_QUESTIONS: usize = 40;
const DEFAULT_A_THRESHOLD: f64 = 60.0;
const DEFAULT_TEST_NAME_MAX_LEN: usize = 200;
const DEFAULT_GROUP_URL_TEMPLATE: &str = "https://t.me/{label}_group";
const DEFAULT_DATABASE_URL: &str = "sqlite:bot.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub admin_ids: HashSet<i64>,
    pub admin_code: String,
    pub group_capacity: u32,
    pub max_questions: usize,
    /// Percentage at or above which a finisher is routed to the "A" groups.
    pub a_threshold: f64,
    pub test_name_max_len: usize,
    pub group_url_template: String,
    pub database_url: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    /// Call `dotenv()` beforehand if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin_code = lookup("ADMIN_CODE")
            .filter(|code| !code.is_empty())
            .ok_or(ConfigError::Missing("ADMIN_CODE"))?;

        let admin_ids = match lookup("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => HashSet::new(),
        };

        let group_capacity = parse_or("GROUP_CAPACITY", &lookup, DEFAULT_GROUP_CAPACITY)?;
        if group_capacity == 0 {
            return Err(ConfigError::invalid("GROUP_CAPACITY", "0"));
        }

        let max_questions = parse_or("TEST_MAX_QUESTIONS", &lookup, DEFAULT_MAX_QUESTIONS)?;
        if max_questions == 0 {
            return Err(ConfigError::invalid("TEST_MAX_QUESTIONS", "0"));
        }

        let a_threshold: f64 = parse_or("A_THRESHOLD", &lookup, DEFAULT_A_THRESHOLD)?;
        if !(0.0..=100.0).contains(&a_threshold) {
            return Err(ConfigError::invalid("A_THRESHOLD", a_threshold.to_string()));
        }

        let test_name_max_len = parse_or("TEST_NAME_MAX_LEN", &lookup, DEFAULT_TEST_NAME_MAX_LEN)?;

        let group_url_template = lookup("GROUP_URL_TEMPLATE")
            .unwrap_or_else(|| DEFAULT_GROUP_URL_TEMPLATE.to_string());
        if !group_url_template.contains("{label}") {
            return Err(ConfigError::invalid("GROUP_URL_TEMPLATE", group_url_template));
        }

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        Ok(Self {
            admin_ids,
            admin_code,
            group_capacity,
            max_questions,
            a_threshold,
            test_name_max_len,
            group_url_template,
            database_url,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// The link handed out for an auto-created group.
    pub fn group_url(&self, label: &str) -> String {
        self.group_url_template.replace("{label}", label)
    }
}

fn parse_admin_ids(raw: &str) -> Result<HashSet<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| ConfigError::invalid("ADMIN_IDS", id))
        })
        .collect()
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(key, raw)),
        None => Ok(default),
    }
}

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quiz_core::model::{ExamSettings, QuestionBank};

use crate::error::ConfigError;
use crate::explanation::GatewayConfig;

pub const DEFAULT_DB_URL: &str = "sqlite://drive_theory.sqlite3?mode=rwc";

/// Runtime configuration read from `QUIZ_*` environment variables.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    pub database_url: String,
    /// JSON question bank; the built-in bank is used when unset.
    pub bank_path: Option<PathBuf>,
    pub exam: ExamSettings,
    /// `None` disables generated explanations.
    pub gateway: Option<GatewayConfig>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_URL.to_owned(),
            bank_path: None,
            exam: ExamSettings::default(),
            gateway: None,
        }
    }
}

impl QuizConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = get("QUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_owned());
        let bank_path = get("QUIZ_BANK_PATH").map(PathBuf::from);

        let exam_size = parse_or(
            "QUIZ_EXAM_SIZE",
            get("QUIZ_EXAM_SIZE"),
            ExamSettings::DEFAULT_EXAM_SIZE,
        )?;
        let duration = parse_or(
            "QUIZ_EXAM_DURATION_SECS",
            get("QUIZ_EXAM_DURATION_SECS"),
            ExamSettings::DEFAULT_DURATION_SECS,
        )?;
        let threshold = parse_or(
            "QUIZ_PASS_THRESHOLD",
            get("QUIZ_PASS_THRESHOLD"),
            ExamSettings::DEFAULT_PASS_THRESHOLD,
        )?;
        let persist_practice = match get("QUIZ_SAVE_PRACTICE") {
            None => false,
            Some(raw) => parse_flag("QUIZ_SAVE_PRACTICE", raw)?,
        };
        let exam = ExamSettings::new(exam_size, duration, threshold, persist_practice)?;

        let gateway = match get("QUIZ_AI_API_KEY") {
            None => None,
            Some(api_key) => {
                let base_url = get("QUIZ_AI_BASE_URL")
                    .unwrap_or_else(|| GatewayConfig::DEFAULT_BASE_URL.to_owned());
                url::Url::parse(&base_url)
                    .map_err(|err| ConfigError::InvalidBaseUrl(format!("{base_url}: {err}")))?;
                let model =
                    get("QUIZ_AI_MODEL").unwrap_or_else(|| GatewayConfig::DEFAULT_MODEL.to_owned());
                let timeout = match get("QUIZ_AI_TIMEOUT_SECS") {
                    None => GatewayConfig::DEFAULT_TIMEOUT,
                    Some(raw) => match raw.parse::<u64>() {
                        Ok(secs) if secs > 0 => Duration::from_secs(secs),
                        _ => {
                            return Err(ConfigError::InvalidValue {
                                var: "QUIZ_AI_TIMEOUT_SECS",
                                raw,
                            });
                        }
                    },
                };
                Some(GatewayConfig {
                    base_url,
                    api_key,
                    model,
                    timeout,
                })
            }
        };

        Ok(Self {
            database_url,
            bank_path,
            exam,
            gateway,
        })
    }

    /// Load the configured bank file, or the built-in bank when none is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or is not a valid bank.
    pub fn load_bank(&self) -> Result<QuestionBank, ConfigError> {
        let Some(path) = &self.bank_path else {
            return Ok(QuestionBank::builtin());
        };
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::BankFile {
            path: path.clone(),
            source,
        })?;
        let bank = QuestionBank::from_json(&json)?;
        tracing::info!(path = %path.display(), questions = bank.len(), "loaded question bank");
        Ok(bank)
    }
}

fn parse_or<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, raw }),
    }
}

fn parse_flag(var: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<QuizConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        QuizConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DB_URL);
        assert_eq!(config.exam, ExamSettings::default());
        assert!(config.bank_path.is_none());
        assert!(config.gateway.is_none());
    }

    #[test]
    fn exam_settings_are_read_and_validated() {
        let config = load(&[
            ("QUIZ_EXAM_SIZE", "10"),
            ("QUIZ_EXAM_DURATION_SECS", "600"),
            ("QUIZ_PASS_THRESHOLD", "0.8"),
            ("QUIZ_SAVE_PRACTICE", "yes"),
        ])
        .unwrap();
        assert_eq!(config.exam.exam_size(), 10);
        assert_eq!(config.exam.exam_duration_secs(), 600);
        assert_eq!(config.exam.pass_mark(10), 8);
        assert!(config.exam.persist_practice());

        assert!(matches!(
            load(&[("QUIZ_EXAM_SIZE", "fifty")]),
            Err(ConfigError::InvalidValue { var: "QUIZ_EXAM_SIZE", .. })
        ));
        assert!(matches!(
            load(&[("QUIZ_EXAM_DURATION_SECS", "0")]),
            Err(ConfigError::ExamSettings(_))
        ));
        assert!(matches!(
            load(&[("QUIZ_SAVE_PRACTICE", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn gateway_needs_a_key_and_a_valid_url() {
        assert!(load(&[("QUIZ_AI_API_KEY", "  ")]).unwrap().gateway.is_none());

        let gateway = load(&[("QUIZ_AI_API_KEY", "sk-test"), ("QUIZ_AI_TIMEOUT_SECS", "5")])
            .unwrap()
            .gateway
            .unwrap();
        assert_eq!(gateway.base_url, GatewayConfig::DEFAULT_BASE_URL);
        assert_eq!(gateway.model, GatewayConfig::DEFAULT_MODEL);
        assert_eq!(gateway.timeout, Duration::from_secs(5));

        assert!(matches!(
            load(&[("QUIZ_AI_API_KEY", "sk-test"), ("QUIZ_AI_BASE_URL", "not a url")]),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn zero_or_garbled_ai_timeout_is_rejected() {
        for raw in ["0", "soon", "-3"] {
            assert!(matches!(
                load(&[("QUIZ_AI_API_KEY", "sk-test"), ("QUIZ_AI_TIMEOUT_SECS", raw)]),
                Err(ConfigError::InvalidValue { var: "QUIZ_AI_TIMEOUT_SECS", .. })
            ));
        }
    }

    #[test]
    fn missing_bank_file_is_reported() {
        let config = load(&[("QUIZ_BANK_PATH", "/nonexistent/bank.json")]).unwrap();
        assert!(matches!(
            config.load_bank(),
            Err(ConfigError::BankFile { .. })
        ));
        assert_eq!(QuizConfig::default().load_bank().unwrap().len(), 5);
    }
}

use crate::services::providers::{anthropic, bedrock};
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 1;

#[derive(Debug, Clone)]
pub struct HabitConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub inference: InferenceConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// Which backend generates plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Bedrock,
    Anthropic,
    Mock,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Bedrock => bedrock::DEFAULT_BEDROCK_MODEL,
            ProviderKind::Anthropic => anthropic::DEFAULT_ANTHROPIC_MODEL,
            ProviderKind::Mock => "mock-model",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bedrock" => Ok(ProviderKind::Bedrock),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown INFERENCE_PROVIDER '{}' (expected bedrock, anthropic or mock)",
                other
            ))),
        }
    }
}

/// Bedrock client settings. Credentials come from the default AWS chain.
#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: String,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub provider: ProviderKind,
    pub model_id: String,
    pub timeout_secs: u64,
    /// Present only for the bedrock provider.
    pub aws: Option<AwsSettings>,
    /// Present only for the anthropic provider.
    pub anthropic_api_key: Option<Secret<String>>,
    /// Overrides the provider's base URL.
    pub endpoint: Option<String>,
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Mock inference with default settings.
    pub fn mock() -> Self {
        Self {
            provider: ProviderKind::Mock,
            model_id: ProviderKind::Mock.default_model().to_string(),
            timeout_secs: DEFAULT_INFERENCE_TIMEOUT_SECS,
            aws: None,
            anthropic_api_key: None,
            endpoint: None,
        }
    }
}

impl HabitConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let provider: ProviderKind = get("INFERENCE_PROVIDER", Some("bedrock"))?.parse()?;
        let model_id = get("INFERENCE_MODEL_ID", Some(provider.default_model()))?;
        let timeout_secs: u64 = parse_setting(
            "INFERENCE_TIMEOUT_SECS",
            &get(
                "INFERENCE_TIMEOUT_SECS",
                Some(DEFAULT_INFERENCE_TIMEOUT_SECS.to_string().as_str()),
            )?,
        )?;

        let (aws, anthropic_api_key, endpoint) = match provider {
            ProviderKind::Bedrock => {
                let max_attempts = get(
                    "AWS_MAX_ATTEMPTS",
                    Some(DEFAULT_AWS_MAX_ATTEMPTS.to_string().as_str()),
                )?;
                let max_attempts: u32 = parse_setting("AWS_MAX_ATTEMPTS", &max_attempts)?;
                if max_attempts == 0 {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "AWS_MAX_ATTEMPTS must be at least 1"
                    )));
                }
                let aws = AwsSettings {
                    region: get("AWS_REGION", Some("us-east-1"))?,
                    max_attempts,
                };
                (Some(aws), None, get_optional_env(&lookup, "BEDROCK_ENDPOINT"))
            }
            ProviderKind::Anthropic => {
                let api_key = Secret::new(get("ANTHROPIC_API_KEY", None)?);
                let base_url = get("ANTHROPIC_BASE_URL", Some(anthropic::ANTHROPIC_API_BASE))?;
                (None, Some(api_key), Some(base_url))
            }
            ProviderKind::Mock => (None, None, None),
        };

        Ok(HabitConfig {
            common,
            mongodb: MongoConfig {
                uri: get("MONGODB_URI", None)?,
                database: get("MONGODB_DATABASE", Some("habit_db"))?,
                collection: get("MONGODB_COLLECTION", Some("habit_plans"))?,
            },
            inference: InferenceConfig {
                provider,
                model_id,
                timeout_secs,
                aws,
                anthropic_api_key,
                endpoint,
            },
            otlp_endpoint: get_optional_env(&lookup, "OTLP_ENDPOINT"),
        })
    }
}

fn get_env<F>(
    lookup: &F,
    key: &str,
    default: Option<&str>,
    is_prod: bool,
) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_setting<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

fn get_optional_env<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|val| !val.trim().is_empty())
}

use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub store: StoreConfig,
    /// Origin of the public payment page, used to build payment links.
    pub public_origin: String,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Only read when `backend` is `mongodb`.
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailDelivery {
    Resend,
    Smtp,
    /// Messages are logged and kept in memory; nothing leaves the process.
    Preview,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub delivery: EmailDelivery,
    /// Sender is `<company> <{sender_local}@{sender_domain}>`.
    pub sender_domain: String,
    pub sender_local: String,
    pub resend: Option<ResendConfig>,
    pub smtp: Option<SmtpConfig>,
}

impl EmailConfig {
    pub fn sender_address(&self) -> String {
        format!("{}@{}", self.sender_local, self.sender_domain)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendConfig {
    pub api_key: Secret<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
}

impl InvoicingConfig {
    pub fn load() -> Result<Self, AppError> {
        let mut common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        if let Ok(level) = env::var("LOG_LEVEL") {
            common.log_level = level;
        }
        if let Ok(endpoint) = env::var("OTLP_ENDPOINT") {
            common.otlp_endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }

        let backend = match get_env("STORE_BACKEND", Some("mongodb"), false)?.as_str() {
            "mongodb" => StoreBackend::Mongodb,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "STORE_BACKEND must be 'mongodb' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let mongodb = match backend {
            StoreBackend::Mongodb => Some(MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("invoicing_db"), is_prod)?,
            }),
            StoreBackend::Memory => None,
        };

        let delivery = match get_env("EMAIL_DELIVERY", Some("preview"), false)?.as_str() {
            "resend" => EmailDelivery::Resend,
            "smtp" => EmailDelivery::Smtp,
            "preview" => EmailDelivery::Preview,
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "EMAIL_DELIVERY must be 'resend', 'smtp' or 'preview', got '{}'",
                    other
                )))
            }
        };

        let resend = match delivery {
            EmailDelivery::Resend => Some(ResendConfig {
                api_key: Secret::new(get_env("RESEND_API_KEY", None, is_prod)?),
                api_url: get_env("RESEND_API_URL", Some("https://api.resend.com"), false)?,
            }),
            _ => None,
        };

        let smtp = match delivery {
            EmailDelivery::Smtp => Some(SmtpConfig {
                host: get_env("SMTP_HOST", None, is_prod)?,
                port: get_env("SMTP_PORT", Some("587"), false)?
                    .parse()
                    .unwrap_or(587),
                user: get_env("SMTP_USER", Some(""), is_prod)?,
                password: Secret::new(get_env("SMTP_PASSWORD", Some(""), is_prod)?),
            }),
            _ => None,
        };

        Ok(InvoicingConfig {
            common,
            store: StoreConfig { backend, mongodb },
            public_origin: get_env("PUBLIC_ORIGIN", Some("http://localhost:5173"), is_prod)?
                .trim_end_matches('/')
                .to_string(),
            email: EmailConfig {
                delivery,
                sender_domain: get_env("EMAIL_SENDER_DOMAIN", Some("indiepilot.io"), false)?,
                sender_local: get_env("EMAIL_SENDER_LOCAL", Some("invoices"), false)?,
                resend,
                smtp,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
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

//! Configuration management for OCR Forge

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::db::Plan;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub quota: QuotaConfig,
    pub billing: BillingConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used to build absolute callback URLs for the payment provider.
    pub public_url: String,
    /// Key material for signing the session cookie. Must be at least 64 bytes;
    /// when unset a fresh key is generated at startup (sessions do not survive
    /// a restart).
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Where uploaded PDFs are written, named `<token>.pdf`.
    pub upload_dir: PathBuf,
    /// Where converted PDFs land, named `<token>_searchable.pdf`.
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    pub free_pages: i64,
    pub pro_pages: i64,
}

impl QuotaConfig {
    /// Page ceiling for an account's plan.
    pub fn ceiling(&self, plan: Plan) -> i64 {
        match plan {
            Plan::Free => self.free_pages,
            Plan::Pro => self.pro_pages,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    pub api_url: String,
    pub api_key: String,
    pub price_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// The ocrmypdf binary to invoke.
    pub binary: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
                secret_key: None,
            },
            database: DatabaseConfig {
                url: "sqlite:./ocrforge.db".to_string(),
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                download_dir: PathBuf::from("downloads"),
            },
            quota: QuotaConfig {
                free_pages: 5,
                pro_pages: 200,
            },
            billing: BillingConfig {
                api_url: "https://sandbox-api.paddle.com".to_string(),
                api_key: String::new(),
                price_id: String::new(),
            },
            ocr: OcrConfig {
                binary: "ocrmypdf".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
                public_url: env::var("PUBLIC_URL").unwrap_or(defaults.server.public_url),
                secret_key: env::var("SECRET_KEY").ok(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                download_dir: env::var("DOWNLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.download_dir),
            },
            quota: QuotaConfig {
                free_pages: env_i64("QUOTA_FREE_PAGES", defaults.quota.free_pages),
                pro_pages: env_i64("QUOTA_PRO_PAGES", defaults.quota.pro_pages),
            },
            billing: BillingConfig {
                api_url: env::var("PADDLE_API_URL").unwrap_or(defaults.billing.api_url),
                api_key: env::var("PADDLE_API_KEY")?,
                price_id: env::var("PADDLE_PRICE_ID")?,
            },
            ocr: OcrConfig {
                binary: env::var("OCRMYPDF_BIN").unwrap_or(defaults.ocr.binary),
            },
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

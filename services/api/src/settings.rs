//! Process-wide settings, read once at startup

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::fmt;

/// Deployment settings
///
/// Built from the environment (`JWT_SECRET` -> `jwt_secret`, ...). Database
/// settings are read separately by `common::database::DatabaseConfig`.
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub app_env: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub s3_bucket_name: String,
    pub s3_region: String,
    pub cloudfront_domain: String,
    pub cloudfront_key_pair_id: String,
    /// PEM text or a path to a PEM file
    pub cloudfront_private_key: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("app_env", "development")?
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("s3_region", "ap-south-1")?
            .add_source(Environment::default())
            .build()
            .context("Failed to read settings from the environment")?
            .try_deserialize()
            .context("Missing or invalid settings")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Cookies get the `Secure` flag in production
    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("JWT_SECRET", &self.jwt_secret),
            ("S3_BUCKET_NAME", &self.s3_bucket_name),
            ("CLOUDFRONT_DOMAIN", &self.cloudfront_domain),
            ("CLOUDFRONT_KEY_PAIR_ID", &self.cloudfront_key_pair_id),
            ("CLOUDFRONT_PRIVATE_KEY", &self.cloudfront_private_key),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("{} must not be empty", name);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("app_env", &self.app_env)
            .field("bind_addr", &self.bind_addr)
            .field("s3_bucket_name", &self.s3_bucket_name)
            .field("s3_region", &self.s3_region)
            .field("cloudfront_domain", &self.cloudfront_domain)
            .field("cloudfront_key_pair_id", &self.cloudfront_key_pair_id)
            .finish_non_exhaustive()
    }
}

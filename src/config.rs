// src/config.rs

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use rust_decimal::Decimal;

use crate::billing::invoice::TaxRates;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub default_currency: String,
    pub default_tax_rates: TaxRates,
    pub cors_allow_any: bool,
}

impl Config {
    /// Reads configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let default_tax_rates = TaxRates {
            iva: parse_or(&lookup, "TAX_IVA_RATE", Decimal::new(16, 2))?,
            municipal: parse_or(&lookup, "TAX_MUNICIPAL_RATE", Decimal::ZERO)?,
            service: parse_or(&lookup, "TAX_SERVICE_RATE", Decimal::ZERO)?,
        };
        default_tax_rates
            .validate()
            .map_err(|e| anyhow!("invalid default tax rates: {e}"))?;

        Ok(Self {
            database_url,
            port: parse_or(&lookup, "PORT", 8080)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            default_currency: lookup("DEFAULT_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "MXN".into()),
            default_tax_rates,
            cors_allow_any: parse_or(&lookup, "CORS_ALLOW_ANY", true)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        _ => Ok(default),
    }
}

//! Environment configuration for the inspect binary.
//!
//! PREDATA_DSN               connection string (libpq key=value or postgres:// URL), required
//! PREDATA_INCLUDE_SCHEMAS   comma-separated schemas to keep (default: all)
//! PREDATA_EXCLUDE_SCHEMAS   comma-separated schemas to drop
//! PREDATA_PRETTY            1/true for pretty-printed JSON

use anyhow::{anyhow, Context, Result};

use crate::catalog::filter::SchemaFilter;

#[derive(Debug, Clone)]
pub struct InspectConfig {
    pub dsn: String,
    pub filter: SchemaFilter,
    pub pretty: bool,
}

fn split_list(v: Option<String>) -> Vec<String> {
    v.map(|s| s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect())
        .unwrap_or_default()
}

fn truthy(v: Option<String>) -> bool {
    matches!(v.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref(), Some("1") | Some("true") | Some("yes"))
}

impl InspectConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let dsn = lookup("PREDATA_DSN").filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("PREDATA_DSN is not set"))?;
        // Validate early so a typo fails before any connection attempt
        dsn.parse::<tokio_postgres::Config>().context("invalid PREDATA_DSN")?;
        let filter = SchemaFilter::new(split_list(lookup("PREDATA_INCLUDE_SCHEMAS")), split_list(lookup("PREDATA_EXCLUDE_SCHEMAS")));
        Ok(Self { dsn, filter, pretty: truthy(lookup("PREDATA_PRETTY")) })
    }
}

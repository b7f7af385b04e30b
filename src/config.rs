use std::collections::HashSet;
use std::time::Duration;

use color_eyre::eyre::WrapErr;
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};

use crate::allocator::{AllocatorOptions, BitmapAllocator};
use crate::ip::{parse_address, parse_subnet, AddressRange};

/// Top-level configuration structure that mirrors the YAML configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Settings shared by every pool
    #[serde(default)]
    pub general: GeneralConfig,
    /// Address pools to manage
    pub pools: Vec<PoolConfig>,
}

/// General settings applied to every pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// (Optional) Log filter for the binary (e.g., "info", "debug")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// (Optional) Maximum wait for a pool worker to answer (e.g., "500ms", "2s")
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

/// Configuration for a single address pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Name of this pool
    pub name: String,
    /// (Optional) CIDR subnet, "a.b.c.d/n" or "a.b.c.d/mask"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    /// (Optional) First address, used together with `to`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// (Optional) Last address, used together with `from`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// (Optional) Addresses claimed as soon as the pool starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved: Vec<String>,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid pool configuration: {0}")]
    InvalidPool(String),
    #[error("Invalid reservation: {0}")]
    InvalidReservation(String),
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            level.parse::<LevelFilter>().map_err(|_| {
                ValidationError::InvalidGeneral(format!("unknown log_level '{}'", level))
            })?;
        }

        if self.general.request_timeout == Some(Duration::ZERO) {
            return Err(ValidationError::InvalidGeneral(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        if self.pools.is_empty() {
            return Err(ValidationError::InvalidPool(
                "at least one pool must be defined".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for pool in &self.pools {
            if pool.name.is_empty() {
                return Err(ValidationError::InvalidPool(
                    "pool name cannot be empty".to_string(),
                ));
            }
            if !names.insert(pool.name.as_str()) {
                return Err(ValidationError::InvalidPool(format!(
                    "duplicate pool name '{}'",
                    pool.name
                )));
            }
            pool.validate()?;
        }

        Ok(())
    }
}

impl GeneralConfig {
    pub fn allocator_options(&self) -> AllocatorOptions {
        AllocatorOptions {
            request_timeout: self.request_timeout,
            worker_name: None,
        }
    }
}

impl PoolConfig {
    /// Resolve the address range this pool covers
    pub fn range(&self) -> Result<AddressRange, ValidationError> {
        let range = match (&self.subnet, &self.from, &self.to) {
            (Some(subnet), None, None) => parse_subnet(subnet),
            (None, Some(from), Some(to)) => {
                let from = parse_address(from).map_err(|e| self.invalid(e))?;
                let to = parse_address(to).map_err(|e| self.invalid(e))?;
                AddressRange::new(from, to).map_err(Into::into)
            }
            _ => {
                return Err(ValidationError::InvalidPool(format!(
                    "pool '{}' must set either 'subnet' or both 'from' and 'to'",
                    self.name
                )))
            }
        };
        range.map_err(|e| self.invalid(e))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let range = self.range()?;

        let mut seen = HashSet::new();
        for text in &self.reserved {
            let addr = parse_address(text).map_err(|e| {
                ValidationError::InvalidReservation(format!("pool '{}': {}", self.name, e))
            })?;
            if !range.contains(addr) {
                return Err(ValidationError::InvalidReservation(format!(
                    "pool '{}': {} is outside {}",
                    self.name, text, range
                )));
            }
            if !seen.insert(addr) {
                return Err(ValidationError::InvalidReservation(format!(
                    "pool '{}': {} is reserved twice",
                    self.name, text
                )));
            }
        }

        Ok(())
    }

    /// Start an allocator for this pool and claim its reserved addresses.
    ///
    /// Reservations that cannot be claimed are logged and skipped; run
    /// [`Config::validate`] first to reject them up front.
    pub fn build(&self, general: &GeneralConfig) -> color_eyre::Result<BitmapAllocator> {
        let mut options = general.allocator_options();
        options.worker_name = Some(format!("ip4pool-{}", self.name));

        let range = self.range()?;
        let allocator = BitmapAllocator::with_options(range, options)
            .wrap_err_with(|| format!("Failed to start pool '{}'", self.name))?;

        for text in &self.reserved {
            let addr = parse_address(text)?;
            if !allocator.assign_specific(addr) {
                warn!("Pool '{}': could not reserve {}", self.name, text);
            }
        }
        Ok(allocator)
    }

    fn invalid(&self, error: impl std::fmt::Display) -> ValidationError {
        ValidationError::InvalidPool(format!("pool '{}': {}", self.name, error))
    }
}

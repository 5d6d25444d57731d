// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Runtime configuration read from environment variables.
//!
//! - `ESSENCIAL_API_URL`: API base URL (default: production backend)
//! - `RUST_LOG`: log filter directive (default: `info`)
//! - `ESSENCIAL_DEBUG_CONSOLE`: `true`/`1` keeps recent log lines in memory
//! - `ESSENCIAL_DEVICE`: `mobile` or `desktop` (default: `desktop`)
//! - `ESSENCIAL_ACCOUNT_RULES`: `split` or `combined` (default: `split`)

use std::env;

use anyhow::{Context, Result};

use crate::logic::compress::DeviceClass;
use crate::logic::submission::ApiConfig;
use crate::logic::validators::AccountRules;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub log_filter: String,
    pub debug_console: bool,
    pub device: DeviceClass,
    pub account_rules: AccountRules,
}

impl AppConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through `lookup`, which maps a variable name to its value.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url =
            var("ESSENCIAL_API_URL").unwrap_or_else(|| ApiConfig::DEFAULT_BASE_URL.to_string());
        let api = ApiConfig::new(&api_url).context("ESSENCIAL_API_URL is not a valid URL")?;

        let log_filter = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let debug_console = var("ESSENCIAL_DEBUG_CONSOLE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let device = match var("ESSENCIAL_DEVICE") {
            Some(name) => DeviceClass::from_name(&name).with_context(|| {
                format!("ESSENCIAL_DEVICE must be mobile or desktop, got {name}")
            })?,
            None => DeviceClass::default(),
        };

        let account_rules = match var("ESSENCIAL_ACCOUNT_RULES") {
            Some(name) => AccountRules::from_name(&name).with_context(|| {
                format!("ESSENCIAL_ACCOUNT_RULES must be split or combined, got {name}")
            })?,
            None => AccountRules::default(),
        };

        Ok(Self {
            api,
            log_filter,
            debug_console,
            device,
            account_rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(
            config.api.base().as_str(),
            "https://essencialpay-form-backend-production.up.railway.app/"
        );
        assert_eq!(config.log_filter, "info");
        assert!(!config.debug_console);
        assert_eq!(config.device, DeviceClass::Desktop);
        assert_eq!(config.account_rules, AccountRules::SPLIT_CHECK_DIGIT);
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = load(&[
            ("ESSENCIAL_API_URL", "http://localhost:3001"),
            ("RUST_LOG", "essencial_form=debug"),
            ("ESSENCIAL_DEBUG_CONSOLE", "TRUE"),
            ("ESSENCIAL_DEVICE", "Mobile"),
            ("ESSENCIAL_ACCOUNT_RULES", "combined"),
        ])
        .unwrap();
        assert_eq!(config.api.base().host_str(), Some("localhost"));
        assert_eq!(config.log_filter, "essencial_form=debug");
        assert!(config.debug_console);
        assert_eq!(config.device, DeviceClass::Mobile);
        assert_eq!(config.account_rules, AccountRules::COMBINED);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("ESSENCIAL_DEVICE", "  "), ("RUST_LOG", "")]).unwrap();
        assert_eq!(config.device, DeviceClass::Desktop);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn unusable_values_are_errors() {
        assert!(load(&[("ESSENCIAL_DEVICE", "tablet")]).is_err());
        assert!(load(&[("ESSENCIAL_ACCOUNT_RULES", "other")]).is_err());
        assert!(load(&[("ESSENCIAL_API_URL", "localhost")]).is_err());
    }
}

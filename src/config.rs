// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use ::config::{Config, Environment, Map};
use serde::Deserialize;
use std::path::PathBuf;

pub const TOKEN_ENV: &str = "UP_BANK_API_TOKEN";
pub const API_BASE_ENV: &str = "UPMIRROR_API_BASE";
pub const DB_PATH_ENV: &str = "UPMIRROR_DB";
pub const PAGE_SIZE_ENV: &str = "UPMIRROR_PAGE_SIZE";

pub const DEFAULT_API_BASE: &str = "https://api.up.com.au/api/v1";
/// Largest page the remote API serves.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct Settings {
    pub token: Option<String>,
    pub api_base: String,
    pub db_path: Option<PathBuf>,
    pub page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            db_path: None,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Environment values as read, before validation. Keys are the variable names
/// with their `UP_BANK_` / `UPMIRROR_` prefix stripped.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    api_token: Option<String>,
    api_base: Option<String>,
    db: Option<String>,
    page_size: Option<String>,
}

impl RawSettings {
    fn load(vars: Option<Map<String, String>>) -> Result<Self> {
        Config::builder()
            .add_source(Environment::with_prefix("UP_BANK").source(vars.clone()))
            .add_source(Environment::with_prefix("UPMIRROR").source(vars))
            .build()
            .and_then(|c| c.try_deserialize::<RawSettings>())
            .map_err(|e| Error::Config(e.to_string()))
    }
}

/// Blank values count as unset.
fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Store file override from `UPMIRROR_DB`. Reads nothing else, so a bad value
/// in an unrelated variable cannot keep the store from opening.
pub fn db_path_from_env() -> Result<Option<PathBuf>> {
    db_path_from(None)
}

pub fn db_path_from_vars(vars: Map<String, String>) -> Result<Option<PathBuf>> {
    db_path_from(Some(vars))
}

fn db_path_from(vars: Option<Map<String, String>>) -> Result<Option<PathBuf>> {
    Ok(non_blank(RawSettings::load(vars)?.db).map(PathBuf::from))
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_raw(RawSettings::load(None)?)
    }

    /// Build settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self> {
        Self::from_raw(RawSettings::load(Some(vars))?)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let page_size = match non_blank(raw.page_size) {
            Some(raw) => {
                let n: u32 = raw.parse().map_err(|_| {
                    Error::Config(format!("{} must be an integer, got '{}'", PAGE_SIZE_ENV, raw))
                })?;
                if n == 0 || n > MAX_PAGE_SIZE {
                    return Err(Error::Config(format!(
                        "{} must be between 1 and {}, got {}",
                        PAGE_SIZE_ENV, MAX_PAGE_SIZE, n
                    )));
                }
                n
            }
            None => MAX_PAGE_SIZE,
        };

        Ok(Self {
            token: non_blank(raw.api_token),
            api_base: non_blank(raw.api_base)
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            db_path: non_blank(raw.db).map(PathBuf::from),
            page_size,
        })
    }

    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "{} is not set; export your Up Bank personal access token",
                TOKEN_ENV
            ))
        })
    }
}

//! Dashboard configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every setting has a default so a bare `adminboard serve` works against a
//! local backend. Parsing goes through a lookup closure so tests can feed a
//! map instead of mutating process env.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/";
pub const DEFAULT_EMPLOYEE_DEFAULT_PATH: &str = "/employee-dashboard";
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &["/login", "/signup", "/forgotPassword", "/resetPassword"];
pub const DEFAULT_STATIC_DIR: &str = "./dist";
pub const DEFAULT_TOKEN_STORE_PATH: &str = "./.adminboard/tokens.json";
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API_BASE_URL '{0}': expected an http:// or https:// URL")]
    InvalidBaseUrl(String),
    #[error("invalid {var} '{value}': paths must start with '/'")]
    InvalidPath { var: &'static str, value: String },
    #[error("LANDING_PATH '{landing}' falls under public path '{public}'; signed-in visitors would redirect forever")]
    LandingIsPublic { landing: String, public: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_HTTP_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS }
    }
}

/// Runtime settings shared by the gate server and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Backend REST root, without a trailing slash.
    pub api_base_url: String,
    pub port: u16,
    pub login_path: String,
    pub landing_path: String,
    /// Where a signed-in employee lands when an admin-only screen rejects them.
    pub employee_default_path: String,
    /// Prefixes served without a session. Always contains `login_path`.
    pub public_paths: Vec<String>,
    pub static_dir: PathBuf,
    pub token_store_path: PathBuf,
    pub timeouts: HttpTimeouts,
    pub cookie_secure: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            port: DEFAULT_PORT,
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            landing_path: DEFAULT_LANDING_PATH.to_owned(),
            employee_default_path: DEFAULT_EMPLOYEE_DEFAULT_PATH.to_owned(),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| (*p).to_owned()).collect(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            token_store_path: PathBuf::from(DEFAULT_TOKEN_STORE_PATH),
            timeouts: HttpTimeouts::default(),
            cookie_secure: false,
        }
    }
}

impl DashboardConfig {
    /// Build config from process environment variables.
    ///
    /// Optional:
    /// - `API_BASE_URL`: backend REST root (default `http://localhost:5000/api`)
    /// - `PORT`: gate server port (default 3000)
    /// - `LOGIN_PATH`, `LANDING_PATH`, `EMPLOYEE_DEFAULT_PATH`
    /// - `PUBLIC_PATHS`: comma-separated path prefixes
    /// - `STATIC_DIR`: built dashboard assets
    /// - `TOKEN_STORE_PATH`: CLI token file
    /// - `HTTP_REQUEST_TIMEOUT_SECS`, `HTTP_CONNECT_TIMEOUT_SECS`
    /// - `COOKIE_SECURE`: boolean
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s), a path setting does
    /// not start with `/`, or the landing path is itself public.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`DashboardConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("API_BASE_URL")
            .map(|raw| raw.trim().trim_end_matches('/').to_owned())
            .unwrap_or(defaults.api_base_url);
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(api_base_url));
        }

        let login_path = path_setting(&lookup, "LOGIN_PATH", defaults.login_path)?;
        let landing_path = path_setting(&lookup, "LANDING_PATH", defaults.landing_path)?;
        let employee_default_path = path_setting(&lookup, "EMPLOYEE_DEFAULT_PATH", defaults.employee_default_path)?;

        let mut public_paths = match lookup("PUBLIC_PATHS") {
            Some(raw) => parse_path_list(&raw)?,
            None => defaults.public_paths,
        };
        if !public_paths.iter().any(|p| p == &login_path) {
            public_paths.push(login_path.clone());
        }
        if let Some(public) = public_paths.iter().find(|p| crate::edge::has_prefix(&landing_path, p)) {
            return Err(ConfigError::LandingIsPublic { landing: landing_path, public: public.clone() });
        }

        Ok(Self {
            api_base_url,
            port: parse_or(lookup("PORT"), defaults.port),
            login_path,
            landing_path,
            employee_default_path,
            public_paths,
            static_dir: lookup("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            token_store_path: lookup("TOKEN_STORE_PATH").map_or(defaults.token_store_path, PathBuf::from),
            timeouts: HttpTimeouts {
                request_secs: parse_or(lookup("HTTP_REQUEST_TIMEOUT_SECS"), DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or(lookup("HTTP_CONNECT_TIMEOUT_SECS"), DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
            },
            cookie_secure: lookup("COOKIE_SECURE")
                .as_deref()
                .and_then(parse_bool)
                .unwrap_or(defaults.cookie_secure),
        })
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn path_setting<F>(lookup: &F, var: &'static str, default: String) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    let value = raw.trim().to_owned();
    if !value.starts_with('/') {
        return Err(ConfigError::InvalidPath { var, value });
    }
    Ok(value)
}

fn parse_path_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('/') {
                Ok(p.to_owned())
            } else {
                Err(ConfigError::InvalidPath { var: "PUBLIC_PATHS", value: p.to_owned() })
            }
        })
        .collect()
}

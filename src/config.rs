use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::model::TalkRecord;

#[derive(Parser, Debug)]
#[command(name = "slidesync")]
#[command(about = "Serves synchronized slides + recording pages for recorded talks", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// Overrides `app.port` from the config file.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".slidesync")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

pub const DEFAULT_POSTER: &str = "https://www.w3.org/2020/Talks/ac-slides/template/AC-2020-slides-banner.png";

/// The page driver embedded with the service.
pub const DEFAULT_CLIENT_SCRIPT: &str = "/talk.js";

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_port")]
    port: u16,
    /// Directory that relative slide, transcript, caption and timecode
    /// sources are read from.
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,
    /// Base that rewritten links are made relative to, i.e. where the
    /// sources live as seen from a rendered page.
    #[serde(default = "default_asset_base")]
    pub asset_base: String,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,
    #[serde(default = "default_poster")]
    pub default_poster: String,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    /// Script that drives the page in the browser. `~` leaves it out.
    #[serde(default = "default_client_script")]
    pub client_script: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_content_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_asset_base() -> String {
    "../".to_string()
}

fn default_cache_max_age() -> u64 {
    60
}

fn default_poster() -> String {
    DEFAULT_POSTER.to_string()
}

fn default_site_name() -> String {
    "Talks".to_string()
}

fn default_client_script() -> Option<String> {
    Some(DEFAULT_CLIENT_SCRIPT.to_string())
}

fn default_fetch_timeout() -> u64 {
    10
}

impl Default for App {
    fn default() -> Self {
        Self {
            port: default_port(),
            content_root: default_content_root(),
            asset_base: default_asset_base(),
            cache_max_age: default_cache_max_age(),
            default_poster: default_poster(),
            site_name: default_site_name(),
            client_script: default_client_script(),
            fetch_timeout_seconds: default_fetch_timeout(),
        }
    }
}

impl App {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    /// Human-readable names for caption language tags.
    #[serde(default)]
    pub languages: HashMap<String, String>,
    #[serde(default)]
    pub talks: Vec<TalkRecord>,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    /// Validates the talk list and freezes it into a catalog.
    pub fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::new(self.talks.clone())?)
    }

    pub fn language_label<'a>(&'a self, code: &'a str) -> &'a str {
        self.languages.get(code).map(String::as_str).unwrap_or(code)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // Handle default values like ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(variable = %var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

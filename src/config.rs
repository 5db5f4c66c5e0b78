// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Configuration for reaching a token.
//!
//! The engine itself is configuration free; this carries what a
//! deployment needs to load a module and authenticate a session.

use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use toml;

#[cfg(not(test))]
const DEFAULT_CONF_DIR: &str = {
    match option_env!("CONFDIR") {
        Some(p) => p,
        None => "/usr/local/etc",
    }
};
#[cfg(test)]
const DEFAULT_CONF_DIR: &str = "test";

pub const DEFAULT_CONF_NAME: &str = "p11keys.conf";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the PKCS#11 module to load.
    pub module: String,
    /// Slot id to open sessions on.
    pub slot: u64,
    /// User PIN, inline. Takes precedence over pin_file.
    pub pin: Option<String>,
    /// Path of a file holding the user PIN.
    pub pin_file: Option<String>,
}

impl Config {
    pub fn find_conf() -> Result<String> {
        /* our own env var has the highest precedence */
        match env::var("P11KEYS_CONF") {
            Ok(var) => return Ok(var),
            Err(_) => (),
        }
        /* Freedesktop config dir, then $HOME/.config, then the
         * system directory */
        let datafile = match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => format!("{}/p11keys/{}", xdg, DEFAULT_CONF_NAME),
            Err(_) => match env::var("HOME") {
                Ok(home) => {
                    format!("{}/.config/p11keys/{}", home, DEFAULT_CONF_NAME)
                }
                Err(_) => format!(
                    "{}/p11keys/{}",
                    DEFAULT_CONF_DIR, DEFAULT_CONF_NAME
                ),
            },
        };
        if Path::new(&datafile).is_file() {
            Ok(datafile)
        } else {
            Err(Error::param("no configuration file found"))
        }
    }

    pub fn from_file(filename: &str) -> Result<Config> {
        let config_str = match fs::read_to_string(filename) {
            Ok(s) => s,
            Err(e) => {
                return Err(Error::param(format!(
                    "cannot read {}: {}",
                    filename, e
                )))
            }
        };
        let conf: Config = toml::from_str(&config_str)
            .map_err(|e| Error::param(format!("{}: {}", filename, e)))?;
        Ok(conf)
    }

    /// Resolves the user PIN, reading the pin file if no inline PIN
    /// was given. Trailing newlines from the file are stripped.
    pub fn user_pin(&self) -> Result<Option<String>> {
        if let Some(pin) = &self.pin {
            return Ok(Some(pin.clone()));
        }
        match &self.pin_file {
            Some(path) => match fs::read_to_string(path) {
                Ok(s) => Ok(Some(s.trim_end_matches('\n').to_string())),
                Err(e) => Err(Error::param(format!(
                    "cannot read pin file {}: {}",
                    path, e
                ))),
            },
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn conf_env_var_wins() {
        env::set_var("P11KEYS_CONF", "/tmp/p11keys-test.conf");
        assert_eq!(
            Config::find_conf().unwrap(),
            "/tmp/p11keys-test.conf".to_string()
        );
        env::remove_var("P11KEYS_CONF");
    }

    #[test]
    fn parse_minimal() {
        let conf: Config = toml::from_str(
            r#"
            module = "/usr/lib/softhsm/libsofthsm2.so"
            slot = 42
            "#,
        )
        .unwrap();
        assert_eq!(conf.slot, 42);
        assert!(conf.pin.is_none());
        assert!(conf.user_pin().unwrap().is_none());
    }

    #[test]
    fn inline_pin_wins() {
        let conf = Config {
            module: "x".to_string(),
            slot: 0,
            pin: Some("1234".to_string()),
            pin_file: Some("/nonexistent".to_string()),
        };
        assert_eq!(conf.user_pin().unwrap(), Some("1234".to_string()));
    }
}

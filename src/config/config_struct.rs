// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

// From this library
use crate::config::ConfigError;
use crate::config::EvalMethod;
use crate::core::utils::misc;

const DEFAULT_CONFIG_FILE: &str = "/etc/blkid.conf";

// cache lives in /run when available, /etc otherwise
const RUNTIME_TOP_DIR: &str = "/run/blkid";
const RUNTIME_CACHE_FILE: &str = "/run/blkid/blkid.tab";
const ETC_CACHE_FILE: &str = "/etc/blkid.tab";

/// Returns the built-in default location of the tag cache file.
pub(crate) fn default_cache_file() -> PathBuf {
    if fs::metadata(RUNTIME_TOP_DIR)
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        PathBuf::from(RUNTIME_CACHE_FILE)
    } else {
        PathBuf::from(ETC_CACHE_FILE)
    }
}

/// Library configuration.
///
/// Lines of `KEY=value`, `#` comments and blank lines; recognised keys:
/// `SEND_UEVENT=yes|no`, `CACHE_FILE=<path>`,
/// `EVALUATE=<comma-separated subset of {udev,scan}>`,
/// `PROBE_OFF=<comma-separated decoder names>`. Unknown keys or malformed
/// values are fatal to the load.
///
/// Share a `Config` between probes and caches with
/// [`Arc`](std::sync::Arc); it is immutable after construction.
#[derive(Debug, Eq, PartialEq)]
pub struct Config {
    cache_file: PathBuf,
    send_uevent: bool,
    evaluate: Vec<EvalMethod>,
    probe_off: Vec<String>,
}

impl Default for Config {
    fn default() -> Config {
        Self {
            cache_file: default_cache_file(),
            send_uevent: true,
            evaluate: vec![EvalMethod::Udev, EvalMethod::Scan],
            probe_off: Vec::new(),
        }
    }
}

impl Config {
    /// Reads the configuration from the file named by the `BLKID_CONF`
    /// environment variable, falling back to `/etc/blkid.conf`. A missing
    /// file yields the built-in defaults.
    pub fn load() -> Result<Config, ConfigError> {
        let filename = misc::safe_getenv("BLKID_CONF")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::load_from(filename)
    }

    /// Reads the configuration from `path`. A missing file yields the
    /// built-in defaults.
    pub fn load_from<T>(path: T) -> Result<Config, ConfigError>
    where
        T: AsRef<Path>,
    {
        let path = path.as_ref();
        log::debug!("Config::load_from reading config file: {:?}", path);

        match fs::read_to_string(path) {
            Ok(content) => content.parse(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "Config::load_from {:?} does not exist, using built-in default",
                    path
                );
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Location of the tag cache file.
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Whether device change events should be forwarded through `udev`.
    pub fn send_uevent(&self) -> bool {
        self.send_uevent
    }

    /// Ordered tag evaluation methods.
    pub fn evaluate(&self) -> &[EvalMethod] {
        &self.evaluate
    }

    /// Superblock decoder names disabled by the configuration; installed as
    /// a NOT-IN type filter when the configuration is attached to a
    /// [`Probe`](crate::probe::Probe).
    pub fn probe_off(&self) -> &[String] {
        &self.probe_off
    }

    fn parse_evaluate(value: &str) -> Result<Vec<EvalMethod>, ConfigError> {
        let mut methods = Vec::new();

        for part in value.split(',') {
            if methods.len() >= 2 {
                return Err(ConfigError::Parse(format!(
                    "too many evaluation methods in: {:?}",
                    value
                )));
            }
            methods.push(part.parse()?);
        }

        Ok(methods)
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cache_file = None;
        let mut send_uevent = None;
        let mut evaluate = Vec::new();
        let mut probe_off = Vec::new();

        for line in s.lines() {
            let line = line.trim_start().trim_end_matches('\r');

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(value) = line.strip_prefix("SEND_UEVENT=") {
                match value {
                    v if v.eq_ignore_ascii_case("yes") => send_uevent = Some(true),
                    v if v.eq_ignore_ascii_case("no") => send_uevent = Some(false),
                    "" => {}
                    v => {
                        return Err(ConfigError::Parse(format!(
                            "malformed SEND_UEVENT value: {:?}",
                            v
                        )))
                    }
                }
            } else if let Some(value) = line.strip_prefix("CACHE_FILE=") {
                if !value.is_empty() {
                    cache_file = Some(PathBuf::from(value));
                }
            } else if let Some(value) = line.strip_prefix("EVALUATE=") {
                if !value.is_empty() {
                    evaluate = Self::parse_evaluate(value)?;
                }
            } else if let Some(value) = line.strip_prefix("PROBE_OFF=") {
                if !value.is_empty() {
                    probe_off = value.split(',').map(|s| s.to_owned()).collect();
                }
            } else {
                return Err(ConfigError::Parse(format!("unknown option: {:?}", line)));
            }
        }

        if evaluate.is_empty() {
            evaluate = vec![EvalMethod::Udev, EvalMethod::Scan];
        }

        Ok(Self {
            cache_file: cache_file.unwrap_or_else(default_cache_file),
            send_uevent: send_uevent.unwrap_or(true),
            evaluate,
            probe_off,
        })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SEND_UEVENT={}",
            if self.send_uevent { "yes" } else { "no" }
        )?;
        writeln!(f, "CACHE_FILE={}", self.cache_file.display())?;

        let methods: Vec<&str> = self.evaluate.iter().map(|m| m.as_str()).collect();
        writeln!(f, "EVALUATE={}", methods.join(","))?;

        if !self.probe_off.is_empty() {
            writeln!(f, "PROBE_OFF={}", self.probe_off.join(","))?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn config_parses_a_complete_file() {
        let content = "# comment\n\nSEND_UEVENT=no\nCACHE_FILE=/tmp/blkid.tab\nEVALUATE=scan\nPROBE_OFF=minix,ufs\n";

        let config: Config = content.parse().unwrap();

        assert_eq!(config.send_uevent(), false);
        assert_eq!(config.cache_file(), Path::new("/tmp/blkid.tab"));
        assert_eq!(config.evaluate(), &[EvalMethod::Scan]);
        assert_eq!(config.probe_off(), &["minix".to_owned(), "ufs".to_owned()]);
    }

    #[test]
    fn config_defaults_evaluation_methods_when_absent() {
        let config: Config = "SEND_UEVENT=yes\n".parse().unwrap();

        assert_eq!(config.evaluate(), &[EvalMethod::Udev, EvalMethod::Scan]);
        assert_eq!(config.send_uevent(), true);
    }

    #[test]
    fn config_rejects_an_unknown_option() {
        let result: Result<Config, _> = "FOOBAR=1\n".parse();

        assert!(result.is_err());
    }

    #[test]
    fn config_rejects_an_unknown_evaluation_method() {
        let result: Result<Config, _> = "EVALUATE=udev,dbus\n".parse();

        assert!(result.is_err());
    }

    #[test]
    fn config_rejects_too_many_evaluation_methods() {
        let result: Result<Config, _> = "EVALUATE=udev,scan,udev\n".parse();

        assert!(result.is_err());
    }

    #[test]
    fn config_serialization_round_trips() {
        let content = "SEND_UEVENT=no\nCACHE_FILE=/tmp/cache.tab\nEVALUATE=scan,udev\nPROBE_OFF=ufs\n";
        let config: Config = content.parse().unwrap();

        let reparsed: Config = config.to_string().parse().unwrap();

        assert_eq!(config, reparsed);
    }
}

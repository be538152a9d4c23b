use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid PORT {0:?}")]
    Port(String),
    #[error("invalid BIND_ADDR {0:?}")]
    BindAddr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub addr: SocketAddr,
    pub log_predictions: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build from any key → value source. Unset keys take their defaults;
    /// `MODEL_PATH`/`SCALER_PATH` override the files under `MODEL_DIR`.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let dir = PathBuf::from(get("MODEL_DIR").unwrap_or_else(|| "./artifacts".to_string()));
        let model_path = get("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| dir.join("best_model.json"));
        let scaler_path = get("SCALER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| dir.join("scaler.json"));

        let port = match get("PORT") {
            Some(s) => s.parse::<u16>().map_err(|_| ConfigError::Port(s))?,
            None => 8000,
        };
        let ip = match get("BIND_ADDR") {
            Some(s) => s.parse::<IpAddr>().map_err(|_| ConfigError::BindAddr(s))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        Ok(Self {
            model_path,
            scaler_path,
            addr: SocketAddr::new(ip, port),
            log_predictions: get("LOG_PRED").as_deref() == Some("1"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| m.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = cfg(&[]).unwrap();
        assert_eq!(c.model_path, PathBuf::from("./artifacts/best_model.json"));
        assert_eq!(c.scaler_path, PathBuf::from("./artifacts/scaler.json"));
        assert_eq!(c.addr, "0.0.0.0:8000".parse().unwrap());
        assert!(!c.log_predictions);
    }

    #[test]
    fn model_dir_and_overrides() {
        let c = cfg(&[("MODEL_DIR", "/srv/lr"), ("SCALER_PATH", "/tmp/s.json")]).unwrap();
        assert_eq!(c.model_path, PathBuf::from("/srv/lr/best_model.json"));
        assert_eq!(c.scaler_path, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn port_bind_and_log_pred() {
        let c = cfg(&[("PORT", "9090"), ("BIND_ADDR", "127.0.0.1"), ("LOG_PRED", "1")]).unwrap();
        assert_eq!(c.addr, "127.0.0.1:9090".parse().unwrap());
        assert!(c.log_predictions);
    }

    #[test]
    fn bad_values_are_errors() {
        assert_eq!(cfg(&[("PORT", "http")]), Err(ConfigError::Port("http".into())));
        assert_eq!(
            cfg(&[("BIND_ADDR", "localhost")]),
            Err(ConfigError::BindAddr("localhost".into()))
        );
    }
}

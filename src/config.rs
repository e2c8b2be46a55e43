use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the HTTP API. Only the server requires it.
    pub auth_token: Option<String>,
    pub listen_addr: String,
    /// Directory of labelled `*.png` reference screens for template matching.
    pub reference_dir: PathBuf,
    pub tesseract_path: PathBuf,
    pub tesseract_lang: String,
    /// Tesseract page segmentation mode (`--psm`).
    pub tesseract_psm: u8,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let auth_token = lookup("RACEWATCH_AUTH_TOKEN").filter(|t| !t.is_empty());

        let listen_addr = lookup("RACEWATCH_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8091".into());

        let reference_dir = lookup("RACEWATCH_REFERENCE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("reference"));

        let tesseract_path = lookup("RACEWATCH_TESSERACT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tesseract"));

        let tesseract_lang = lookup("RACEWATCH_TESSERACT_LANG").unwrap_or_else(|| "eng".into());

        let tesseract_psm = match lookup("RACEWATCH_TESSERACT_PSM") {
            Some(v) => v.trim().parse::<u8>().map_err(|e| ConfigError::InvalidValue {
                name: "RACEWATCH_TESSERACT_PSM".into(),
                reason: format!("{v}: {e}"),
            })?,
            None => 3,
        };

        Ok(Config {
            auth_token,
            listen_addr,
            reference_dir,
            tesseract_path,
            tesseract_lang,
            tesseract_psm,
        })
    }

    pub fn require_auth_token(&self) -> Result<&str, ConfigError> {
        self.auth_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnv("RACEWATCH_AUTH_TOKEN".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8091");
        assert_eq!(config.reference_dir, PathBuf::from("reference"));
        assert_eq!(config.tesseract_path, PathBuf::from("tesseract"));
        assert_eq!(config.tesseract_lang, "eng");
        assert_eq!(config.tesseract_psm, 3);
        assert!(config.auth_token.is_none());
        assert!(matches!(
            config.require_auth_token(),
            Err(ConfigError::MissingEnv(_))
        ));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("RACEWATCH_AUTH_TOKEN", "s3cret"),
            ("RACEWATCH_REFERENCE_DIR", "/srv/marbles/refs"),
            ("RACEWATCH_TESSERACT_PSM", " 6 "),
        ])
        .unwrap();
        assert_eq!(config.require_auth_token().unwrap(), "s3cret");
        assert_eq!(config.reference_dir, PathBuf::from("/srv/marbles/refs"));
        assert_eq!(config.tesseract_psm, 6);
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let config = config_from(&[("RACEWATCH_AUTH_TOKEN", "")]).unwrap();
        assert!(config.require_auth_token().is_err());
    }

    #[test]
    fn rejects_bad_psm() {
        let err = config_from(&[("RACEWATCH_TESSERACT_PSM", "auto")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}

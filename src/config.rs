//! Service configuration read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};

use crate::checkpoint::CheckpointPolicy;

const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5000",
];

/// Whether a run must carry an authorising signature image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMode {
    /// Drawn when one is uploaded.
    #[default]
    Optional,
    Required,
}

impl FromStr for SignatureMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optional" | "none" => Ok(SignatureMode::Optional),
            "required" => Ok(SignatureMode::Required),
            other => Err(format!(
                "unknown signature mode '{other}', expected 'optional' or 'required'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub gen_dir: PathBuf,
    pub checkpoint_file: PathBuf,
    pub template_path: PathBuf,
    pub mark_path: Option<PathBuf>,
    pub signature_mode: SignatureMode,
    pub checkpoint_policy: CheckpointPolicy,
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            gen_dir: PathBuf::from("gens"),
            checkpoint_file: PathBuf::from("checkpoint.json"),
            template_path: PathBuf::from("static/certificate-template.png"),
            mark_path: None,
            signature_mode: SignatureMode::default(),
            checkpoint_policy: CheckpointPolicy::default(),
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("CERT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(port) = get("CERT_PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("CERT_PORT must be a port number, got '{port}'"))?;
        }
        if let Some(dir) = get("CERT_UPLOAD_DIR") {
            config.upload_dir = dir.into();
        }
        if let Some(dir) = get("CERT_GEN_DIR") {
            config.gen_dir = dir.into();
        }
        if let Some(file) = get("CERT_CHECKPOINT_FILE") {
            config.checkpoint_file = file.into();
        }
        if let Some(path) = get("CERT_TEMPLATE_PATH") {
            config.template_path = path.into();
        }
        config.mark_path = get("CERT_MARK_PATH").map(PathBuf::from);
        if let Some(mode) = get("CERT_SIGNATURE_MODE") {
            config.signature_mode = mode.parse().map_err(|e: String| anyhow!(e))?;
        }
        if let Some(policy) = get("CERT_CHECKPOINT_POLICY") {
            config.checkpoint_policy = policy.parse().map_err(|e: String| anyhow!(e))?;
        }
        if let Some(origins) = get("CERT_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 5000);
        assert_eq!(config.signature_mode, SignatureMode::Optional);
        assert_eq!(config.checkpoint_policy, CheckpointPolicy::Coarse);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("CERT_PORT", "8081"),
            ("CERT_MARK_PATH", "static/mark.png"),
            ("CERT_SIGNATURE_MODE", "Required"),
            ("CERT_CHECKPOINT_POLICY", "per-record"),
            ("CERT_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.mark_path, Some(PathBuf::from("static/mark.png")));
        assert_eq!(config.signature_mode, SignatureMode::Required);
        assert_eq!(config.checkpoint_policy, CheckpointPolicy::PerRecord);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config(&[("CERT_PORT", "eighty")]).is_err());
        let err = config(&[("CERT_SIGNATURE_MODE", "sometimes")]).unwrap_err();
        assert!(err.to_string().contains("sometimes"));
        assert!(config(&[("CERT_CHECKPOINT_POLICY", "hourly")]).is_err());
    }
}

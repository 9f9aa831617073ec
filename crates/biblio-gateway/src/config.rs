use std::path::Path;
use std::time::Duration;

use biblio_crypto::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

pub const ENV_MSP_ID: &str = "MSP_ID";
pub const ENV_CHANNEL_NAME: &str = "CHANNEL_NAME";
pub const ENV_CHAINCODE_NAME: &str = "CHAINCODE_NAME";

/// Client-side settings for talking to one contract on one channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub msp_id: String,
    pub channel_name: String,
    pub chaincode_name: String,
    pub hash_algorithm: HashAlgorithm,
    pub timeouts: Timeouts,
}

/// Per-stage call deadlines, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub evaluate_ms: u64,
    pub endorse_ms: u64,
    pub submit_ms: u64,
    pub commit_status_ms: u64,
}

impl Timeouts {
    pub fn evaluate(&self) -> Duration {
        Duration::from_millis(self.evaluate_ms)
    }

    pub fn endorse(&self) -> Duration {
        Duration::from_millis(self.endorse_ms)
    }

    pub fn submit(&self) -> Duration {
        Duration::from_millis(self.submit_ms)
    }

    pub fn commit_status(&self) -> Duration {
        Duration::from_millis(self.commit_status_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            evaluate_ms: 5_000,
            endorse_ms: 15_000,
            submit_ms: 5_000,
            commit_status_ms: 60_000,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            msp_id: "Org1MSP".into(),
            channel_name: "mychannel".into(),
            chaincode_name: "basic".into(),
            hash_algorithm: HashAlgorithm::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> GatewayResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> GatewayResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| GatewayError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> GatewayResult<String> {
        toml::to_string_pretty(self).map_err(|e| GatewayError::Serialization(e.to_string()))
    }

    /// Override fields from `MSP_ID`, `CHANNEL_NAME` and `CHAINCODE_NAME`.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with a custom lookup.
    /// Empty values are ignored.
    pub fn apply_env_with<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_MSP_ID) {
            self.msp_id = v;
        }
        if let Some(v) = get(ENV_CHANNEL_NAME) {
            self.channel_name = v;
        }
        if let Some(v) = get(ENV_CHAINCODE_NAME) {
            self.chaincode_name = v;
        }
    }

    pub fn validate(&self) -> GatewayResult<()> {
        for (field, value) in [
            ("msp_id", &self.msp_id),
            ("channel_name", &self.channel_name),
            ("chaincode_name", &self.chaincode_name),
        ] {
            if value.trim().is_empty() {
                return Err(GatewayError::InvalidConfig(format!("{field} must not be empty")));
            }
        }
        let t = &self.timeouts;
        if [t.evaluate_ms, t.endorse_ms, t.submit_ms, t.commit_status_ms].contains(&0) {
            return Err(GatewayError::InvalidConfig("timeouts must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_sample_network() {
        let c = GatewayConfig::default();
        assert_eq!(c.msp_id, "Org1MSP");
        assert_eq!(c.channel_name, "mychannel");
        assert_eq!(c.chaincode_name, "basic");
        assert_eq!(c.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(c.timeouts.evaluate(), Duration::from_secs(5));
        assert_eq!(c.timeouts.endorse(), Duration::from_secs(15));
        assert_eq!(c.timeouts.submit(), Duration::from_secs(5));
        assert_eq!(c.timeouts.commit_status(), Duration::from_secs(60));
        c.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = GatewayConfig::from_toml(
            r#"
            channel_name = "library"
            hash_algorithm = "blake3"

            [timeouts]
            commit_status_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(c.channel_name, "library");
        assert_eq!(c.msp_id, "Org1MSP");
        assert_eq!(c.hash_algorithm, HashAlgorithm::Blake3);
        assert_eq!(c.timeouts.commit_status_ms, 1000);
        assert_eq!(c.timeouts.endorse_ms, 15_000);
    }

    #[test]
    fn toml_roundtrip() {
        let c = GatewayConfig {
            chaincode_name: "catalog".into(),
            ..GatewayConfig::default()
        };
        let back = GatewayConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        assert!(matches!(
            GatewayConfig::from_toml("msp_id = ["),
            Err(GatewayError::InvalidConfig(_))
        ));
        assert!(GatewayConfig::from_toml("channel_name = \"\"").is_err());
        assert!(GatewayConfig::from_toml("[timeouts]\nsubmit_ms = 0").is_err());
    }

    #[test]
    fn env_overrides_non_empty_values() {
        let env: HashMap<&str, &str> = [
            ("MSP_ID", "Org2MSP"),
            ("CHANNEL_NAME", "  "),
            ("CHAINCODE_NAME", "catalog"),
        ]
        .into_iter()
        .collect();
        let mut c = GatewayConfig::default();
        c.apply_env_with(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.msp_id, "Org2MSP");
        assert_eq!(c.channel_name, "mychannel");
        assert_eq!(c.chaincode_name, "catalog");
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = GatewayConfig::from_file(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(err.to_string().contains("gateway.toml"));
    }
}

//! TOML configuration with environment-variable API-key indirection
//!
//! Secrets never live in the config file itself; the file names the
//! environment variable that holds them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level platform configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformConfig {
    pub platform: PlatformSection,
    #[serde(default)]
    pub server: ServerSection,
    pub llm: LlmSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    /// Agent roster created at startup
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
}

/// Platform identity section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformSection {
    /// Platform instance name
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Reasoning-service section
///
/// `provider = "synthetic"` runs the whole platform without network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name ("openai", "anthropic", "synthetic")
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Optional base URL override (OpenAI-compatible gateways)
    #[serde(default)]
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_timeout() -> u64 {
    60
}

/// Pipeline scheduling section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// When set, a background loop runs a full cycle every interval
    #[serde(default)]
    pub cycle_interval_secs: Option<u64>,
}

/// Declarative description of one agent to create
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentSpec {
    /// Stage type string ("discovery", "listing", ...)
    pub stage: String,
    /// Display name
    pub name: String,
    /// Listing / market-making strategy
    #[serde(default)]
    pub strategy: Option<String>,
    /// Discovery domain focus
    #[serde(default)]
    pub specialty: Option<String>,
    /// Audit review focus
    #[serde(default)]
    pub audit_focus: Option<String>,
    /// Governance voting style
    #[serde(default)]
    pub governance_style: Option<String>,
    /// Trading strategy; falls back to `strategy` when unset
    #[serde(default)]
    pub trading_strategy: Option<String>,
    /// Seed for the synthetic strategy RNG (deterministic tests)
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PlatformConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PlatformConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.llm.provider.as_str() {
            "openai" | "anthropic" | "synthetic" => {}
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "unknown llm provider: {other}"
                )))
            }
        }
        if self.llm.provider != "synthetic" && self.llm.api_key_env.is_none() {
            return Err(ConfigError::InvalidConfig(
                "llm.api_key_env is required for remote providers".to_string(),
            ));
        }
        for spec in &self.agents {
            spec.stage
                .parse::<crate::agent::StageKind>()
                .map_err(|_| {
                    ConfigError::InvalidConfig(format!("unknown agent stage: {}", spec.stage))
                })?;
        }
        Ok(())
    }

    /// Get the reasoning-service API key from the named environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        let env_name = self.llm.api_key_env.as_ref().ok_or_else(|| {
            ConfigError::InvalidConfig("llm.api_key_env is not set".to_string())
        })?;
        std::env::var(env_name).map_err(|_| ConfigError::EnvVarNotFound(env_name.clone()))
    }

    /// Built-in configuration used when no config file is given
    ///
    /// The roster mirrors the default platform staffing: three discovery
    /// specialists, two listing strategists, one auditor, two market
    /// makers, three traders and one governance delegate.
    pub fn default_config() -> Self {
        Self {
            platform: PlatformSection {
                name: "agentmarket".to_string(),
                description: "agent-driven prediction market pipeline".to_string(),
            },
            server: ServerSection::default(),
            llm: LlmSection {
                provider: "synthetic".to_string(),
                model: "synthetic".to_string(),
                api_key_env: None,
                base_url: None,
                temperature: Some(0.7),
                max_tokens: Some(1024),
                timeout_secs: default_llm_timeout(),
            },
            pipeline: PipelineSection::default(),
            agents: default_roster(),
        }
    }
}

fn roster_entry(stage: &str, name: &str) -> AgentSpec {
    AgentSpec {
        stage: stage.to_string(),
        name: name.to_string(),
        ..AgentSpec::default()
    }
}

fn default_roster() -> Vec<AgentSpec> {
    vec![
        AgentSpec {
            specialty: Some("politics".to_string()),
            ..roster_entry("discovery", "Political Scout")
        },
        AgentSpec {
            specialty: Some("crypto".to_string()),
            ..roster_entry("discovery", "Crypto Scout")
        },
        AgentSpec {
            specialty: Some("sports".to_string()),
            ..roster_entry("discovery", "Sports Scout")
        },
        AgentSpec {
            strategy: Some("aggressive".to_string()),
            ..roster_entry("listing", "Aggressive Lister")
        },
        AgentSpec {
            strategy: Some("conservative".to_string()),
            ..roster_entry("listing", "Conservative Lister")
        },
        AgentSpec {
            audit_focus: Some("compliance".to_string()),
            ..roster_entry("audit", "Compliance Auditor")
        },
        AgentSpec {
            strategy: Some("tight_spread".to_string()),
            ..roster_entry("market_maker", "Tight Maker")
        },
        AgentSpec {
            strategy: Some("wide_spread".to_string()),
            ..roster_entry("market_maker", "Wide Maker")
        },
        AgentSpec {
            trading_strategy: Some("momentum".to_string()),
            ..roster_entry("trading", "Momentum Trader")
        },
        AgentSpec {
            trading_strategy: Some("contrarian".to_string()),
            ..roster_entry("trading", "Contrarian Trader")
        },
        AgentSpec {
            trading_strategy: Some("arbitrage".to_string()),
            ..roster_entry("trading", "Arbitrage Trader")
        },
        AgentSpec {
            governance_style: Some("pragmatic".to_string()),
            ..roster_entry("governance", "Pragmatic Delegate")
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[platform]
name = "agentmarket"

[server]
port = 9000

[llm]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"

[pipeline]
cycle_interval_secs = 300

[[agents]]
stage = "discovery"
name = "Crypto Scout"
specialty = "crypto"
seed = 42

[[agents]]
stage = "listing"
name = "Lister"
strategy = "balanced"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: PlatformConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.platform.name, "agentmarket");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.pipeline.cycle_interval_secs, Some(300));
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.agents[0].specialty.as_deref(), Some("crypto"));
        assert_eq!(config.agents[0].seed, Some(42));
    }

    #[test]
    fn test_remote_provider_requires_api_key_env() {
        let toml_str = r#"
[platform]
name = "p"

[llm]
provider = "anthropic"
model = "claude-3-5-haiku-latest"
"#;
        let config: PlatformConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_roster_stage_is_rejected() {
        let toml_str = r#"
[platform]
name = "p"

[llm]
provider = "synthetic"
model = "synthetic"

[[agents]]
stage = "oracle"
name = "X"
"#;
        let config: PlatformConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_resolution() {
        let mut config = PlatformConfig::default_config();
        config.llm.api_key_env = Some("AGENTMARKET_TEST_KEY".to_string());

        std::env::set_var("AGENTMARKET_TEST_KEY", "sk-test");
        assert_eq!(config.get_llm_api_key().unwrap(), "sk-test");

        std::env::remove_var("AGENTMARKET_TEST_KEY");
        assert!(matches!(
            config.get_llm_api_key(),
            Err(ConfigError::EnvVarNotFound(_))
        ));
    }

    #[test]
    fn test_default_config_roster_is_valid() {
        let config = PlatformConfig::default_config();
        config.validate().unwrap();

        let discovery = config
            .agents
            .iter()
            .filter(|a| a.stage == "discovery")
            .count();
        let trading = config.agents.iter().filter(|a| a.stage == "trading").count();
        assert_eq!(discovery, 3);
        assert_eq!(trading, 3);
    }
}

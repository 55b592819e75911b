// src/config.rs

use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub pairing: PairingSection,
    #[serde(default)]
    pub llm: LlmSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where pairing links point. The phone opens `{base_url}/mobile?code=...`,
/// so this must be an address the phone can actually reach.
#[derive(Debug, Deserialize)]
pub struct PairingSection {
    #[serde(default = "default_pairing_base_url")]
    pub base_url: String,
}

fn default_pairing_base_url() -> String {
    "http://localhost:8090".to_string()
}

impl Default for PairingSection {
    fn default() -> Self {
        PairingSection {
            base_url: default_pairing_base_url(),
        }
    }
}

/// Which vision-model backend to call for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    Ollama,
    Cliproxy,
    Remote,
}

#[derive(Debug, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub backend: LlmBackend,
    #[serde(default = "default_ollama")]
    pub ollama: EndpointSection,
    #[serde(default = "default_cliproxy")]
    pub cliproxy: EndpointSection,
    #[serde(default = "default_remote")]
    pub remote: EndpointSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        LlmSection {
            backend: LlmBackend::default(),
            ollama: default_ollama(),
            cliproxy: default_cliproxy(),
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSection {
    pub base_url: String,
    pub model: String,
}

fn default_ollama() -> EndpointSection {
    EndpointSection {
        base_url: "http://localhost:11434/v1".to_string(),
        model: "qwen2.5vl:7b".to_string(),
    }
}

fn default_cliproxy() -> EndpointSection {
    EndpointSection {
        base_url: "http://localhost:8317/v1".to_string(),
        model: "gemini-2.5-flash".to_string(),
    }
}

fn default_remote() -> EndpointSection {
    EndpointSection {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o-mini".to_string(),
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_fills_every_default() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8090);
        assert_eq!(cfg.pairing.base_url, "http://localhost:8090");
        assert_eq!(cfg.llm.backend, LlmBackend::Ollama);
        assert_eq!(cfg.llm.ollama.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn partial_config_overrides_only_what_it_names() {
        let cfg: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [pairing]
            base_url = "https://scan.example.com"

            [llm]
            backend = "remote"

            [llm.remote]
            base_url = "https://api.example.com/v1"
            model = "vision-large"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.pairing.base_url, "https://scan.example.com");
        assert_eq!(cfg.llm.backend, LlmBackend::Remote);
        assert_eq!(cfg.llm.remote.model, "vision-large");
    }
}

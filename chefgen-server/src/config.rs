use serde::Deserialize;

use crate::generation::gemini::DEFAULT_BASE_URL;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub generation: GenerationConfig,
}

impl Config {
    /// Load the configuration from a YAML file. A missing file means all defaults.
    pub fn load(yml_path: &str) -> anyhow::Result<Self> {
        if !std::path::Path::new(yml_path).exists() {
            return Ok(Self::default());
        }
        let yml = std::fs::read_to_string(yml_path)?;
        let config = serde_yaml::from_str(&yml)?;
        Ok(config)
    }

    /// Let the environment (and `.env`) override secrets and deployment paths.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(address) = dotenvy::var("CHEFGEN_ADDRESS") {
            self.server.address = address;
        }
        if let Ok(path) = dotenvy::var("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Ok(secret) = dotenvy::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(key) = dotenvy::var("GEMINI_API_KEY") {
            self.generation.api_key = Some(key);
        }
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub tls: Option<TLSConfig>,
    /// Write JSON logs to a daily rolling file in this directory instead of stdout.
    pub log_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:5000".into(),
            tls: None,
            log_dir: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TLSConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/chefgen.db".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_lifetime_days: i64,
    /// Cheap Argon2 parameters. Never enable this in production.
    pub insecure_fast_hashing: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_lifetime_days: 7,
            insecure_fast_hashing: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Tried in order until one answers.
    pub models: Vec<String>,
    /// Upper bound on a single model call. `None` waits forever.
    pub attempt_timeout_secs: Option<u64>,
    /// Initial pause after a quota failure before the next model, doubling on each
    /// further quota failure. Zero moves on immediately.
    pub quota_backoff_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            models: [
                "gemini-flash-latest",
                "gemini-2.5-flash",
                "gemini-2.0-flash",
                "gemini-2.0-flash-001",
                "gemini-pro-latest",
                "gemini-2.5-pro",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            attempt_timeout_secs: Some(60),
            quota_backoff_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load("/definitely/not/here.yml").unwrap();
        assert_eq!(config.server.address, "0.0.0.0:5000");
        assert_eq!(config.generation.models.len(), 6);
        assert_eq!(config.generation.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.generation.models[0], "gemini-flash-latest");
        assert_eq!(config.auth.token_lifetime_days, 7);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chefgen.yml");
        std::fs::write(
            &path,
            "database:\n  path: /tmp/x.db\ngeneration:\n  models: [a, b]\n  quota_backoff_ms: 250\n",
        )
        .unwrap();
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.database.path, "/tmp/x.db");
        assert_eq!(config.generation.models, vec!["a", "b"]);
        assert_eq!(config.generation.quota_backoff_ms, 250);
        assert_eq!(config.generation.attempt_timeout_secs, Some(60));
        assert_eq!(config.server.address, "0.0.0.0:5000");
        assert!(config.server.tls.is_none());
    }

    #[test]
    fn tls_section_parses() {
        let config: Config = serde_yaml::from_str(
            "server:\n  address: 127.0.0.1:8443\n  tls:\n    cert_path: c.pem\n    key_path: k.pem\n",
        )
        .unwrap();
        let tls = config.server.tls.unwrap();
        assert_eq!(tls.cert_path, "c.pem");
        assert_eq!(config.server.address, "127.0.0.1:8443");
    }
}

//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// AI Agent Factory backend configuration.
///
/// Every option can also be set through the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "agent-factory-server",
    about = "AI Agent Factory REST backend and MCP server"
)]
pub struct Config {
    /// HTTP bind address
    #[arg(long, env = "FACTORY_BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    /// Deployment environment name, reported by /health
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Allowed CORS origins (comma separated, `*` for any)
    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// JSON snapshot file; storage is memory-only when unset
    #[arg(long, env = "FACTORY_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Devin API base URL
    #[arg(long, env = "DEVIN_API_URL", default_value = "https://api.devin.ai/v1")]
    pub devin_api_url: String,

    /// Devin API key; sessions are only created when set
    #[arg(long, env = "DEVIN_API_KEY", hide_env_values = true)]
    pub devin_api_key: Option<String>,

    /// Devin API request timeout (seconds)
    #[arg(long, env = "DEVIN_TIMEOUT_SECS", default_value = "30")]
    pub devin_timeout_secs: u64,

    /// GitHub owner for agent repositories
    #[arg(long, env = "GITHUB_ORG", default_value = "thedoctorJJ")]
    pub github_org: String,

    /// Public URL of the MCP endpoint, reported by /api/v1/mcp/status
    #[arg(long, env = "MCP_SERVER_URL")]
    pub mcp_public_url: Option<String>,

    /// Agent health probe timeout (seconds)
    #[arg(long, env = "HEALTH_CHECK_TIMEOUT_SECS", default_value = "10")]
    pub health_check_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            data_file: None,
            devin_api_url: "https://api.devin.ai/v1".to_string(),
            devin_api_key: None,
            devin_timeout_secs: 30,
            github_org: "thedoctorJJ".to_string(),
            mcp_public_url: None,
            health_check_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn devin_timeout(&self) -> Duration {
        Duration::from_secs(self.devin_timeout_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    /// Devin API key, ignoring blank values.
    pub fn devin_key(&self) -> Option<&str> {
        self.devin_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// URL clients should use for the MCP endpoint.
    pub fn mcp_url(&self) -> String {
        match &self.mcp_public_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => {
                let port = self.bind_addr.rsplit(':').next().unwrap_or("8000");
                format!("http://127.0.0.1:{port}/mcp")
            }
        }
    }

    /// True when any origin is allowed.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o.trim() == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse_from(["agent-factory-server"]);
        assert_eq!(config.devin_timeout_secs, 30);
        assert_eq!(config.github_org, "thedoctorJJ");
        assert!(config.cors_allows_any());
    }

    #[test]
    fn test_cors_origins_are_comma_separated() {
        let config = Config::parse_from([
            "agent-factory-server",
            "--cors-origins",
            "http://localhost:3000,https://factory.example.com",
        ]);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.cors_allows_any());
    }

    #[test]
    fn test_blank_devin_key_is_ignored() {
        let config = Config {
            devin_api_key: Some("  ".into()),
            ..Config::default()
        };
        assert!(config.devin_key().is_none());
    }

    #[test]
    fn test_mcp_url_fallback() {
        let config = Config::default();
        assert_eq!(config.mcp_url(), "http://127.0.0.1:8000/mcp");

        let config = Config {
            mcp_public_url: Some("https://mcp.example.com/mcp".into()),
            ..Config::default()
        };
        assert_eq!(config.mcp_url(), "https://mcp.example.com/mcp");
    }
}

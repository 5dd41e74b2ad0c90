use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub docs: DocsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Reported by the health endpoint
    pub service_name: String,
    pub instance_id: String,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Metadata of the generated OpenAPI document
#[derive(Debug, Clone)]
pub struct DocsConfig {
    pub title: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub default_filter: String,
}

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:8000,http://localhost";

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .context("API_PORT must be a valid port number")?,
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "moto-backend".to_string()),
                // If unset, fall back to HOSTNAME (Docker/Kubernetes), otherwise "unknown".
                instance_id: env::var("INSTANCE_ID")
                    .or_else(|_| env::var("HOSTNAME"))
                    .unwrap_or_else(|_| "unknown".to_string()),
            },
            cors: CorsConfig {
                allowed_origins: parse_list(
                    &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string()),
                ),
                allow_credentials: env::var("CORS_ALLOW_CREDENTIALS")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .context("CORS_ALLOW_CREDENTIALS must be true or false")?,
            },
            docs: DocsConfig {
                title: env::var("API_TITLE").unwrap_or_else(|_| "Moto API".to_string()),
                description: env::var("API_DESCRIPTION")
                    .unwrap_or_else(|_| "API for managing moto data".to_string()),
                version: env::var("API_VERSION").unwrap_or_else(|_| "1.0.0".to_string()),
            },
            logging: LoggingConfig {
                default_filter: env::var("LOG_LEVEL")
                    .unwrap_or_else(|_| "info,moto_backend=debug".to_string()),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                service_name: "moto-backend".to_string(),
                instance_id: "unknown".to_string(),
            },
            cors: CorsConfig {
                allowed_origins: parse_list(DEFAULT_ORIGINS),
                allow_credentials: true,
            },
            docs: DocsConfig {
                title: "Moto API".to_string(),
                description: "API for managing moto data".to_string(),
                version: "1.0.0".to_string(),
            },
            logging: LoggingConfig {
                default_filter: "info,moto_backend=debug".to_string(),
            },
        }
    }
}

/// Split a comma separated env value, dropping blanks
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 3000;

        assert_eq!(config.server_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" http://a.test , ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_default_origins() {
        let config = Config::default();
        assert_eq!(config.cors.allowed_origins.len(), 3);
        assert_eq!(config.server.service_name, "moto-backend");
    }
}

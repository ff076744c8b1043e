use std::env;

use anyhow::{Context, Result};
use tracing::warn;

const DEFAULT_RABBITMQ_HOST: &str = "localhost";
const DEFAULT_RABBITMQ_PORT: u16 = 5672;
const DEFAULT_RABBITMQ_CREDENTIAL: &str = "guest";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_AUTH_SECRET: &str = "your-secret-key";

/// Process settings read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rabbitmq_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub cors_allowed_origin: String,
    pub auth_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let rabbitmq_url = match env::var("RABBITMQ_URL") {
            Ok(url) => url,
            Err(_) => {
                let host = env::var("RABBITMQ_HOST").unwrap_or_else(|_| {
                    warn!("RABBITMQ_HOST not set, using {DEFAULT_RABBITMQ_HOST}");
                    DEFAULT_RABBITMQ_HOST.to_string()
                });
                let port = parse_port("RABBITMQ_PORT", DEFAULT_RABBITMQ_PORT)?;
                let user = env::var("RABBITMQ_USER")
                    .unwrap_or_else(|_| DEFAULT_RABBITMQ_CREDENTIAL.to_string());
                let password = env::var("RABBITMQ_PASSWORD")
                    .unwrap_or_else(|_| DEFAULT_RABBITMQ_CREDENTIAL.to_string());
                amqp_url(&host, port, &user, &password)
            }
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let port = parse_port("PORT", DEFAULT_PORT)?;

        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| {
            warn!("CORS_ALLOWED_ORIGIN not set, using {DEFAULT_CORS_ORIGIN}");
            DEFAULT_CORS_ORIGIN.to_string()
        });

        let auth_secret = env::var("AUTH_SECRET").unwrap_or_else(|_| {
            warn!("AUTH_SECRET not set, using default secret");
            DEFAULT_AUTH_SECRET.to_string()
        });

        Ok(Self {
            rabbitmq_url,
            bind_addr,
            port,
            cors_allowed_origin,
            auth_secret,
        })
    }
}

fn parse_port(var: &str, default: u16) -> Result<u16> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{var} must be a port number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// AMQP URL for the default vhost.
pub fn amqp_url(host: &str, port: u16, user: &str, password: &str) -> String {
    format!("amqp://{user}:{password}@{host}:{port}/%2f")
}

/// Helper to log a broker URL without credentials.
pub fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if url[..colon_pos].contains("//") {
                let mut s = String::with_capacity(url.len());
                s.push_str(&url[..(colon_pos + 1)]);
                s.push_str("***");
                s.push_str(&url[at_pos..]);
                return s;
            }
        }
    }
    url.to_string()
}

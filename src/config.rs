//! Runtime configuration from flags, environment and `.env`.

use anyhow::{bail, Result};
use clap::Parser;
use std::net::SocketAddr;

/// Secret used when none is configured. Fine for local runs only.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Debug, Clone, Parser)]
#[command(name = "account-service")]
#[command(about = "User account service with JWT authentication")]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// SQLite database file holding the accounts
    #[arg(long, env = "ACCOUNTS_DB_PATH", default_value = "accounts.db")]
    pub database_path: String,

    /// HMAC secret for signing tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// bcrypt work factor for password hashes (4-31)
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Admin account created at startup if missing
    #[arg(long, env = "ADMIN_EMAIL", requires = "admin_password")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {}", self.bcrypt_cost);
        }
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Admin credentials to seed, when both are set.
    pub fn admin_seed(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["account-service"]).unwrap();

        assert!(config.validate().is_ok());
        assert!(!config.database_path.is_empty());
    }

    #[test]
    fn test_flags_override() {
        let config = Config::try_parse_from([
            "account-service",
            "--port",
            "8081",
            "--host",
            "127.0.0.1",
            "--jwt-secret",
            "another-secret",
            "--bcrypt-cost",
            "5",
            "--admin-email",
            "root@x.com",
            "--admin-password",
            "rootpw",
        ])
        .unwrap();

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8081");
        assert!(!config.uses_dev_secret());
        assert_eq!(config.admin_seed(), Some(("root@x.com", "rootpw")));
    }

    #[test]
    fn test_bad_cost_rejected() {
        let config =
            Config::try_parse_from(["account-service", "--bcrypt-cost", "2"]).unwrap();
        assert!(config.validate().is_err());
    }
}

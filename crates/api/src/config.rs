use fleetledger_core::metadata::ProfitLoanTreatment;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on draining in-flight requests after a shutdown signal
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Whether loan payments count as expenses in profit figures.
    pub profit_loan_treatment: ProfitLoanTreatment,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `PROFIT_LOAN_TREATMENT` | `exclude`                  |
    ///
    /// Any present but unparseable value is an error so misconfiguration
    /// stops the server at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        host.parse::<std::net::IpAddr>().map_err(|e| ConfigError::Invalid {
            name: "HOST",
            reason: e.to_string(),
        })?;

        let port: u16 = parse_env("PORT", "3000")?;

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            origin
                .parse::<axum::http::HeaderValue>()
                .map_err(|e| ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    reason: format!("'{origin}': {e}"),
                })?;
        }

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", "30")?;
        let shutdown_timeout_secs: u64 = parse_env("SHUTDOWN_TIMEOUT_SECS", "30")?;

        let profit_loan_treatment = ProfitLoanTreatment::parse(&env_or(
            "PROFIT_LOAN_TREATMENT",
            ProfitLoanTreatment::default().as_str(),
        ))
        .map_err(|e| ConfigError::Invalid {
            name: "PROFIT_LOAN_TREATMENT",
            reason: e.to_string(),
        })?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            profit_loan_treatment,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_env<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(name, default)
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        })
}

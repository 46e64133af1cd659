use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

// Placeholder shipped in sample .env files, never a real key
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "nmap-ai-gateway")]
#[command(about = "Runs nmap scans, summarizes them with an AI provider and renders PDF reports")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    // development or production
    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    // Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    #[arg(
        long,
        env = "GEMINI_API_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_url: String,

    // Base url of the python ML service
    #[arg(long, env = "ML_API_URL", default_value = "http://localhost:5000")]
    pub ml_api_url: String,

    // Allowed CORS origin in production
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    // Scanner binary
    #[arg(long, env = "NMAP_BIN", default_value = "nmap")]
    pub nmap_bin: String,

    // Scan timeout in seconds
    #[arg(long, env = "SCAN_TIMEOUT_SECS", default_value_t = 300)]
    pub scan_timeout: u64,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 900)]
    pub rate_window: u64,

    // Stale rate limit entries sweep interval in seconds
    #[arg(long, env = "RATE_LIMIT_SWEEP_SECS", default_value_t = 300)]
    pub sweep_interval: u64,

    // Chrome/Chromium executable, auto-detected when absent
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    // Overrides the environment's private network policy
    #[arg(long, env = "BLOCK_PRIVATE_NETWORKS")]
    pub block_private: Option<bool>,
}

impl Args {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Private/loopback targets are refused in production unless overridden.
    pub fn block_private_networks(&self) -> bool {
        self.block_private.unwrap_or_else(|| self.is_production())
    }

    /// The configured Gemini key, if it is usable.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::parse_from(["nmap-ai-gateway"]);
        assert_eq!(args.port, 3001);
        assert_eq!(args.environment, Environment::Development);
        assert_eq!(args.rate_limit, 10);
        assert_eq!(args.rate_window(), Duration::from_secs(15 * 60));
        assert_eq!(args.sweep_interval(), Duration::from_secs(5 * 60));
        assert_eq!(args.scan_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn production_blocks_private_networks_unless_overridden() {
        let args = Args::parse_from(["gw", "--environment", "production"]);
        assert!(args.block_private_networks());

        let args = Args::parse_from(["gw", "--environment", "production", "--block-private", "false"]);
        assert!(!args.block_private_networks());

        let args = Args::parse_from(["gw"]);
        assert!(!args.block_private_networks());
    }

    #[test]
    fn placeholder_key_counts_as_missing() {
        let args = Args::parse_from(["gw", "--gemini-api-key", "your_gemini_api_key_here"]);
        assert_eq!(args.api_key(), None);

        let args = Args::parse_from(["gw", "--gemini-api-key", " abc123 "]);
        assert_eq!(args.api_key(), Some("abc123"));
    }
}

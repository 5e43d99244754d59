// src/config/mod.rs
// Process configuration, loaded once from .env and the environment

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StoryConfig {
    // ── Provider
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub text_model: String,
    pub vision_model: String,
    pub image_model: String,
    pub image_size: String,

    // ── Generation limits
    pub story_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub describe_max_tokens: u32,
    pub min_description_paragraphs: usize,

    // ── Retry & timeouts (seconds)
    pub rate_limit_max_attempts: u32,
    pub retry_base_secs: u64,
    pub request_timeout: u64,
    pub connect_timeout: u64,
    pub server_timeout: u64,

    // ── Document assembly
    pub scratch_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub max_image_bytes: u64,

    // ── Server
    pub host: String,
    pub port: u16,
    pub cors_origin: String,

    // ── Logging
    pub log_level: String,
}

// Strips trailing comments and whitespace before parsing; a value that
// fails to parse falls back to the default.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn dotenv_warning(result: &dotenvy::Result<PathBuf>) -> Option<String> {
    match result {
        Ok(_) => None,
        Err(e) if e.not_found() => {
            Some(".env file not found. Using environment variables and defaults.".to_string())
        }
        Err(e) => Some(format!(".env file could not be loaded ({e}). Using the environment.")),
    }
}

impl StoryConfig {
    pub fn from_env() -> Self {
        // Runs before tracing is installed, hence stderr
        if let Some(warning) = dotenv_warning(&dotenvy::dotenv()) {
            eprintln!("Warning: {warning}");
        }

        let default_scratch = std::env::temp_dir().join("storyteller");

        Self {
            openai_api_key: env_var_opt("OPENAI_API_KEY"),
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com/v1".to_string()),
            text_model: env_var_or("STORY_TEXT_MODEL", "gpt-4o-mini".to_string()),
            vision_model: env_var_or("STORY_VISION_MODEL", "gpt-4o-mini".to_string()),
            image_model: env_var_or("STORY_IMAGE_MODEL", "dall-e-3".to_string()),
            image_size: env_var_or("STORY_IMAGE_SIZE", "1024x1024".to_string()),
            story_max_tokens: env_var_or("STORY_MAX_TOKENS", 1200),
            summary_max_tokens: env_var_or("STORY_SUMMARY_MAX_TOKENS", 200),
            describe_max_tokens: env_var_or("STORY_DESCRIBE_MAX_TOKENS", 1500),
            min_description_paragraphs: env_var_or("STORY_MIN_DESCRIPTION_PARAGRAPHS", 5),
            rate_limit_max_attempts: env_var_or("STORY_RATE_LIMIT_MAX_ATTEMPTS", 5),
            retry_base_secs: env_var_or("STORY_RETRY_BASE_SECS", 1),
            request_timeout: env_var_or("STORY_REQUEST_TIMEOUT", 120),
            connect_timeout: env_var_or("STORY_CONNECT_TIMEOUT", 30),
            server_timeout: env_var_or("STORY_SERVER_TIMEOUT", 600),
            scratch_dir: env_var_or("STORY_SCRATCH_DIR", default_scratch),
            max_upload_bytes: env_var_or("STORY_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            max_image_bytes: env_var_or("STORY_MAX_IMAGE_BYTES", 20 * 1024 * 1024),
            host: env_var_or("STORY_HOST", "0.0.0.0".to_string()),
            port: env_var_or("PORT", 3003),
            cors_origin: env_var_or("STORY_CORS_ORIGIN", "*".to_string()),
            log_level: env_var_or("STORY_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Full provider URL for an endpoint path such as `chat/completions`
    pub fn openai_api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.openai_base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Upper bound on handling one inbound request, retries included
    pub fn server_timeout(&self) -> Duration {
        Duration::from_secs(self.server_timeout)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_secs(self.retry_base_secs)
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<StoryConfig> = Lazy::new(StoryConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> StoryConfig {
        StoryConfig {
            openai_base_url: "http://localhost:9999/v1/".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3003,
            log_level: "debug".to_string(),
            ..StoryConfig::from_env()
        }
    }

    #[test]
    fn test_dotenv_warning() {
        assert_eq!(dotenv_warning(&Ok(PathBuf::from(".env"))), None);

        let missing = dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        let warning = dotenv_warning(&Err(missing)).unwrap();
        assert!(warning.contains("not found"));

        let malformed = dotenvy::Error::LineParse("KEY=\"unterminated".to_string(), 4);
        let warning = dotenv_warning(&Err(malformed)).unwrap();
        assert!(warning.contains("could not be loaded"));
    }

    #[test]
    fn test_env_var_or_falls_back_for_missing_key() {
        let port: u16 = env_var_or("STORYTELLER_TEST_SURELY_UNSET_KEY", 3003);
        assert_eq!(port, 3003);
    }

    #[test]
    fn test_openai_api_url_joins_single_slash() {
        let config = base();
        assert_eq!(
            config.openai_api_url("/chat/completions"),
            "http://localhost:9999/v1/chat/completions"
        );
        assert_eq!(
            config.openai_api_url("images/generations"),
            "http://localhost:9999/v1/images/generations"
        );
    }

    #[test]
    fn test_convenience_methods() {
        let config = base();
        assert_eq!(config.bind_address(), "127.0.0.1:3003");
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);

        let config = StoryConfig {
            log_level: "chatty".to_string(),
            ..base()
        };
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }
}

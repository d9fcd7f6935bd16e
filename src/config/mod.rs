use crate::services::keys::PartitionStrategy;
use std::env;

/// Gateway configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listening port (default: 3000)
    pub port: u16,

    /// Key partitioning scheme: "region" or "user" (default: region)
    pub partition_strategy: PartitionStrategy,

    /// Lifetime of upload URLs in seconds (default: 300)
    pub upload_url_ttl_secs: u64,

    /// Lifetime of download URLs in seconds (default: 3600)
    pub download_url_ttl_secs: u64,

    /// Maximum declared upload size in bytes (default: 10 MB)
    pub max_file_size: u64,

    /// Content types accepted for upload. Empty means any detected type.
    pub allowed_file_types: Vec<String>,

    /// JWT HMAC secret
    pub jwt_secret: String,

    /// JWT lifetime in seconds (default: 24 hours)
    pub jwt_expires_in_secs: u64,

    /// Allowed CORS origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Echo internal error details back to clients
    pub expose_error_details: bool,

    /// Directory holding the built file-manager UI, served as a fallback
    pub static_dir: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            partition_strategy: PartitionStrategy::Region,
            upload_url_ttl_secs: 300,
            download_url_ttl_secs: 3600,
            max_file_size: 10 * 1024 * 1024, // 10 MB
            allowed_file_types: Vec::new(),
            jwt_secret: "secret".to_string(),
            jwt_expires_in_secs: 24 * 60 * 60,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
            expose_error_details: false,
            static_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let partition_strategy = match env::var("KEY_PARTITION") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to region partitioning", e);
                default.partition_strategy
            }),
            Err(_) => default.partition_strategy,
        };

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            partition_strategy,

            upload_url_ttl_secs: env::var("PRESIGNED_URL_UPLOAD_EXPIRES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.upload_url_ttl_secs),

            download_url_ttl_secs: env::var("PRESIGNED_URL_DOWNLOAD_EXPIRES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.download_url_ttl_secs),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_file_types: env::var("ALLOWED_FILE_TYPES")
                .map(|v| split_list(&v))
                .unwrap_or(default.allowed_file_types),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set, using the insecure default");
                default.jwt_secret
            }),

            jwt_expires_in_secs: env::var("JWT_EXPIRES_IN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.jwt_expires_in_secs),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(default.allowed_origins),

            expose_error_details: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("development"))
                .unwrap_or(default.expose_error_details),

            static_dir: env::var("STATIC_DIR").ok().filter(|v| !v.is_empty()),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

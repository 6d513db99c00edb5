use std::env;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PLATFORM_FEE: f64 = 50.0;
pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 168;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub platform_fee: f64,
    pub allowed_origins: Vec<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            jwt_expiry_hours: parse_or_default("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS),
            payment_key_id: env::var("PAYMENT_KEY_ID")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_KEY_ID not set, payments disabled");
                    String::new()
                }),
            payment_key_secret: env::var("PAYMENT_KEY_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_KEY_SECRET not set, payments disabled");
                    String::new()
                }),
            platform_fee: parse_or_default("PLATFORM_FEE", DEFAULT_PLATFORM_FEE),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_else(|_| default_origins()),
            port: parse_or_default("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.payment_key_id.is_empty() && !self.payment_key_secret.is_empty()
    }

    /// CORS decision for a request `Origin` header value.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.allowed_origins.iter().any(|o| o == "*" || o == origin) {
            return true;
        }

        // Local frontends run on arbitrary dev ports
        origin.starts_with("http://localhost:") || origin.starts_with("http://127.0.0.1:")
    }
}

fn parse_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn default_origins() -> Vec<String> {
    [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:3001",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origins(origins: Vec<String>) -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "service-key".to_string(),
            jwt_secret: "secret".to_string(),
            jwt_expiry_hours: DEFAULT_JWT_EXPIRY_HOURS,
            payment_key_id: String::new(),
            payment_key_secret: String::new(),
            platform_fee: DEFAULT_PLATFORM_FEE,
            allowed_origins: origins,
            port: DEFAULT_PORT,
        }
    }

    #[test]
    fn test_parse_origins_trims_and_drops_empty() {
        let origins = parse_origins(" https://a.example , ,https://b.example,");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_origin_allowed_from_list() {
        let config = config_with_origins(vec!["https://medicare.example".to_string()]);
        assert!(config.is_origin_allowed("https://medicare.example"));
        assert!(!config.is_origin_allowed("https://evil.example"));
    }

    #[test]
    fn test_localhost_any_port_allowed() {
        let config = config_with_origins(vec![]);
        assert!(config.is_origin_allowed("http://localhost:5173"));
        assert!(config.is_origin_allowed("http://127.0.0.1:8080"));
        assert!(!config.is_origin_allowed("http://localhost.evil.example"));
    }

    #[test]
    fn test_wildcard_allows_everything() {
        let config = config_with_origins(vec!["*".to_string()]);
        assert!(config.is_origin_allowed("https://anything.example"));
    }

    #[test]
    fn test_configuration_flags() {
        let mut config = config_with_origins(default_origins());
        assert!(config.is_configured());
        assert!(!config.is_payment_configured());

        config.payment_key_id = "key".to_string();
        config.payment_key_secret = "secret".to_string();
        assert!(config.is_payment_configured());

        config.jwt_secret.clear();
        assert!(!config.is_configured());
    }
}

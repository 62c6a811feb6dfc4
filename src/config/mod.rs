use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_response_headers_layer;

pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub qr_secret: String,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/turnstile".to_string()),
            port: parse_or(env::var("PORT").ok(), 3001),
            qr_secret: env::var("QR_TOKEN_SECRET").unwrap_or_else(|_| {
                tracing::warn!("QR_TOKEN_SECRET not set, using the development secret");
                "turnstile-dev-secret".to_string()
            }),
            rate_limit_max_requests: parse_or(env::var("RATE_LIMIT_MAX_REQUESTS").ok(), 30),
            rate_limit_window_secs: parse_or(env::var("RATE_LIMIT_WINDOW_SECS").ok(), 60),
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_accepts_valid_values() {
        assert_eq!(parse_or(Some("8080".to_string()), 3001u16), 8080);
        assert_eq!(parse_or(Some(" 15 ".to_string()), 30u32), 15);
    }

    #[test]
    fn test_parse_or_falls_back_on_garbage() {
        assert_eq!(parse_or(Some("not-a-number".to_string()), 3001u16), 3001);
        assert_eq!(parse_or(None, 60u64), 60);
    }
}

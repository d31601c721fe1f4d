use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

pub struct Config {
    pub database_url: String,
    pub stripe_secret_key: String,
    pub app_origin: String,
    pub jwt_secret: String,
    pub identity_api_url: String,
    pub identity_api_key: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/tessera".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .expect("STRIPE_SECRET_KEY must be set"),
            app_origin: normalize_origin(
                &env::var("APP_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            identity_api_url: env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
            identity_api_key: env::var("IDENTITY_API_KEY").unwrap_or_default(),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(3001),
        }
    }
}

/// Checkout redirect URLs are built off this origin; a stray trailing
/// slash would produce `//checkout/...` URLs the gateway rejects.
pub fn normalize_origin(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_normalization_strips_trailing_slashes_and_whitespace() {
        assert_eq!(normalize_origin("https://tessera.events/"), "https://tessera.events");
        assert_eq!(normalize_origin("  https://tessera.events  "), "https://tessera.events");
        assert_eq!(normalize_origin("http://localhost:5173"), "http://localhost:5173");
    }
}

use axum::http::{header, HeaderName, HeaderValue, Method};
use std::env;
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins_from_env())
        // The API surface is GET for reads, POST for operations and DELETE
        // for the deletion workflows; nothing is PUT/PATCH shaped.
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

/// Allowed browser origins: the configured app origin plus any extras from
/// CORS_ALLOWED_ORIGINS, falling back to the local dev servers.
fn allowed_origins_from_env() -> AllowOrigin {
    let mut raw: Vec<String> = Vec::new();
    if let Ok(app_origin) = env::var("APP_ORIGIN") {
        raw.push(app_origin);
    }
    let extras = env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());
    raw.extend(extras.split(',').map(str::to_string));

    let origins: Vec<HeaderValue> = raw
        .iter()
        .filter_map(|origin| {
            let trimmed = origin.trim().trim_end_matches('/');
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, allowing any origin");
        AllowOrigin::any()
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
        AllowOrigin::list(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_origins_parse_as_header_values() {
        for origin in DEFAULT_ALLOWED_ORIGINS.split(',') {
            assert!(
                origin.trim().parse::<HeaderValue>().is_ok(),
                "Default origin '{}' should be a valid HeaderValue",
                origin
            );
        }
    }
}

//! CORS (Cross-Origin Resource Sharing) configuration
//!
//! The frontend is normally served by this same process, but the API stays
//! reachable from a separately hosted dev frontend.

use axum::http::{header, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::CorsSection;

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (None = allow all)
    pub allowed_origins: Option<Vec<String>>,
    /// Preflight cache duration in seconds
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: None,
            max_age_secs: 86400,
        }
    }
}

impl CorsConfig {
    /// Allow any origin
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Only allow the given origins
    pub fn strict(origins: Vec<String>) -> Self {
        Self {
            allowed_origins: Some(origins),
            max_age_secs: 3600,
        }
    }

    /// Empty origin list in the config means any origin
    pub fn from_section(section: &CorsSection) -> Self {
        if section.allowed_origins.is_empty() {
            Self::permissive()
        } else {
            Self::strict(section.allowed_origins.clone())
        }
    }

    /// Convert to tower-http CorsLayer
    pub fn into_layer(self) -> CorsLayer {
        let origin = match &self.allowed_origins {
            Some(origins) if !origins.iter().any(|o| o == "*") => {
                let values: Vec<HeaderValue> =
                    origins.iter().filter_map(|o| o.parse().ok()).collect();
                AllowOrigin::list(values)
            }
            _ => AllowOrigin::any(),
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
            .expose_headers([header::CONTENT_DISPOSITION])
            .max_age(Duration::from_secs(self.max_age_secs))
    }
}

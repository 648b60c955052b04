pub mod feedback;
pub mod health;
pub mod orders;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::ServerConfig;
use crate::intake::Intake;
use crate::rate_limit::{rate_limit, FixedWindowLimiter, RateLimitConfig};

pub struct InnerAppState {
    pub intake: Intake,
    pub limiter: Arc<FixedWindowLimiter>,
}

pub type AppState = Arc<InnerAppState>;

pub fn app_state(intake: Intake, rate_limit: RateLimitConfig) -> AppState {
    Arc::new(InnerAppState {
        intake,
        limiter: Arc::new(FixedWindowLimiter::new(rate_limit)),
    })
}

/// CORS for browser callers: one configured origin, or any origin.
pub fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let origin = match allowed_origin {
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                warn!("ignoring invalid allowed origin {origin:?}: {e}");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        },
        None => AllowOrigin::any(),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut api = Router::new()
        .merge(feedback::routes())
        .merge(orders::routes());
    if state.limiter.is_enabled() {
        api = api.route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit,
        ));
    }

    Router::new()
        .merge(health::routes())
        .merge(api)
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(cors_layer(config.allowed_origin.as_deref()))
        .with_state(state)
}

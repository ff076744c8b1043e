use crate::jwt::Claims;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

pub const TEST_AUTH_SECRET: &str = "test-secret-key";

pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info,lapin=warn"));
        // Another subscriber may already be installed by the test harness.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_test_writer())
            .try_init();
    });
}

/// Test-only JWT helper that issues a signed JWT using the same algorithm/claims as production
pub fn test_issue_token(sub: &str, email: &str, ttl_seconds: i64, secret: &str) -> String {
    let now = chrono::Utc::now();
    let iat = usize::try_from(now.timestamp()).unwrap_or_default();
    let exp = usize::try_from(now.timestamp() + ttl_seconds).unwrap_or_default();

    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap_or_default()
}

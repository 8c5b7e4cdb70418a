//! In-process stand-ins for the remote analytics source and the auth service.
//!
//! Both answer from fixed fixtures after a simulated delay. The delay can be
//! scaled (0.0 makes every call resolve on the next poll), and individual
//! domains can be made to fail or return a different payload.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::debug;

use crate::auth::User;
use crate::error::AuthError;
use crate::models::Domain;
use crate::provider::{AuthProvider, DataProvider, LoginGrant};

/// Token issued by [`MockAuthProvider`] on every successful login.
pub const MOCK_TOKEN: &str = "mock-jwt-token";

const LOGIN_DELAY: Duration = Duration::from_millis(800);
const CHECK_DELAY: Duration = Duration::from_millis(500);

/// Unscaled response time of the mock data source for `domain`.
pub fn base_delay(domain: Domain) -> Duration {
    let ms = match domain {
        Domain::Summary => 1000,
        Domain::ChannelMetrics => 800,
        Domain::AudienceMetrics => 900,
        Domain::ContentMetrics => 850,
        Domain::TrendSeries => 950,
    };
    Duration::from_millis(ms)
}

/// The demo dataset for `domain`, in provider wire shape.
pub fn fixture(domain: Domain) -> Value {
    match domain {
        Domain::Summary => json!({
            "totalAudience": 1200000,
            "audienceGrowth": 12.3,
            "engagementRate": 4.5,
            "engagementChange": 0.8,
            "contentConsistency": 85,
            "consistencyChange": -2.1,
            "roi": 3.2,
            "roiChange": 0.4,
        }),
        Domain::ChannelMetrics => json!([
            { "name": "Website", "reach": 450000, "engagement": 5.2, "conversion": 2.1 },
            { "name": "Social Media", "reach": 320000, "engagement": 7.8, "conversion": 1.5 },
            { "name": "Streaming", "reach": 180000, "engagement": 6.1, "conversion": 0.9 },
            { "name": "Traditional Media", "reach": 250000, "engagement": 2.3, "conversion": 0.7 },
        ]),
        Domain::AudienceMetrics => json!([
            { "platform": "Website", "value": 450000, "percentage": 37.5 },
            { "platform": "Social Media", "value": 320000, "percentage": 26.7 },
            { "platform": "Streaming", "value": 180000, "percentage": 15 },
            { "platform": "Traditional Media", "value": 250000, "percentage": 20.8 },
        ]),
        Domain::ContentMetrics => json!([
            { "type": "Video", "engagement": 8.7, "reach": 520000, "growth": 15.2 },
            { "type": "Articles", "engagement": 4.2, "reach": 350000, "growth": 7.8 },
            { "type": "Social Posts", "engagement": 6.5, "reach": 480000, "growth": 12.3 },
            { "type": "Audio", "engagement": 5.1, "reach": 210000, "growth": 9.6 },
            { "type": "Interactive", "engagement": 9.3, "reach": 180000, "growth": 23.5 },
        ]),
        Domain::TrendSeries => {
            let rows: [(&str, u32, u32, u32, u32); 12] = [
                ("Jan", 410000, 280000, 150000, 260000),
                ("Feb", 415000, 285000, 155000, 258000),
                ("Mar", 422000, 290000, 160000, 255000),
                ("Apr", 428000, 295000, 165000, 252000),
                ("May", 435000, 300000, 168000, 250000),
                ("Jun", 440000, 305000, 172000, 248000),
                ("Jul", 442000, 310000, 175000, 245000),
                ("Aug", 445000, 312000, 176000, 248000),
                ("Sep", 447000, 315000, 177000, 249000),
                ("Oct", 448000, 318000, 178000, 250000),
                ("Nov", 449000, 319000, 179000, 250000),
                ("Dec", 450000, 320000, 180000, 250000),
            ];
            Value::Array(
                rows.iter()
                    .map(|(month, website, social, streaming, traditional)| {
                        json!({
                            "month": month,
                            "website": website,
                            "socialMedia": social,
                            "streaming": streaming,
                            "traditionalMedia": traditional,
                        })
                    })
                    .collect(),
            )
        }
    }
}

fn scaled(base: Duration, latency: f64) -> Duration {
    let ms = base.as_millis() as f64 * latency.max(0.0);
    Duration::from_millis(ms.round() as u64)
}

// =============================================================================
// Data Provider
// =============================================================================

/// Fixture-backed [`DataProvider`].
///
/// ```ignore
/// let provider = MockDataProvider::new()
///     .with_latency(0.0)
///     .with_failure(Domain::AudienceMetrics, "network unreachable");
/// ```
#[derive(Debug, Clone)]
pub struct MockDataProvider {
    latency: f64,
    failures: HashMap<Domain, String>,
    payloads: HashMap<Domain, Value>,
}

impl Default for MockDataProvider {
    fn default() -> Self {
        Self {
            latency: 1.0,
            failures: HashMap::new(),
            payloads: HashMap::new(),
        }
    }
}

impl MockDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiply every simulated delay by `factor`. Negative factors count as 0.
    pub fn with_latency(mut self, factor: f64) -> Self {
        self.latency = factor;
        self
    }

    /// Make every fetch of `domain` fail with `message`.
    pub fn with_failure(mut self, domain: Domain, message: impl Into<String>) -> Self {
        self.failures.insert(domain, message.into());
        self
    }

    /// Answer `domain` with `payload` instead of the fixture.
    pub fn with_payload(mut self, domain: Domain, payload: Value) -> Self {
        self.payloads.insert(domain, payload);
        self
    }

    /// Effective delay for `domain`.
    pub fn delay(&self, domain: Domain) -> Duration {
        scaled(base_delay(domain), self.latency)
    }
}

#[async_trait]
impl DataProvider for MockDataProvider {
    async fn fetch(&self, domain: Domain) -> Result<Value> {
        let delay = self.delay(domain);
        debug!(domain = %domain, delay_ms = delay.as_millis() as u64, "mock fetch");
        sleep(delay).await;

        if let Some(message) = self.failures.get(&domain) {
            return Err(anyhow!("{}", message));
        }
        Ok(self
            .payloads
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| fixture(domain)))
    }
}

// =============================================================================
// Auth Provider
// =============================================================================

/// Accepts any non-empty identifier with a secret longer than three
/// characters, and treats every non-empty token as a valid session.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    latency: f64,
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self { latency: 1.0 }
    }
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, factor: f64) -> Self {
        self.latency = factor;
        self
    }

    /// The account a restored session resolves to.
    pub fn session_user() -> User {
        User {
            id: "1".into(),
            name: "Demo User".into(),
            email: "user@example.com".into(),
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn login(&self, identifier: &str, secret: &str) -> Result<LoginGrant, AuthError> {
        sleep(scaled(LOGIN_DELAY, self.latency)).await;

        if identifier.trim().is_empty() || secret.chars().count() <= 3 {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(LoginGrant {
            token: MOCK_TOKEN.to_string(),
            user: User {
                id: "1".into(),
                name: "Demo User".into(),
                email: identifier.to_string(),
            },
        })
    }

    async fn check_session(&self, token: &str) -> Result<Option<User>, AuthError> {
        sleep(scaled(CHECK_DELAY, self.latency)).await;

        if token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::session_user()))
    }

    async fn logout(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

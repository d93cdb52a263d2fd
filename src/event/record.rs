//! Wide event record and its request-scoped builder.
//!
//! One `WideEvent` exists per handled request. Business logic only ever sees
//! the `WideEventBuilder`; the boundary consumes it into the immutable record
//! right before emission.

use std::collections::BTreeMap;

use serde::Serialize;

/// Constant discriminator carried by every record.
pub const EVENT_TYPE: &str = "wide_event";

/// Final outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    /// Outcome implied by an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        if status < 400 {
            Outcome::Success
        } else {
            Outcome::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

/// Static per-process service metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub region: String,
    pub environment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpFacet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Who made the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserFacet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_subscription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_account_age_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_lifetime_value_cents: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartFacet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_item_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_total_cents: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_discount_percent: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentFacet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_attempt: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorFacet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_retriable: Option<bool>,
}

/// The finalized, immutable record for one request.
///
/// Facets are flattened on serialization, so the JSON shape is a single
/// object with prefixed keys. Only `feature_flags` and `custom` stay nested
/// and are expanded by [`crate::event::flatten`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideEvent {
    pub request_id: String,
    pub trace_id: String,
    pub timestamp: String,

    #[serde(flatten)]
    pub service: ServiceInfo,

    #[serde(flatten)]
    pub http: HttpFacet,

    #[serde(flatten)]
    pub user: UserFacet,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(flatten)]
    pub cart: CartFacet,

    #[serde(flatten)]
    pub payment: PaymentFacet,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    #[serde(flatten)]
    pub error: ErrorFacet,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_flags: BTreeMap<String, bool>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, serde_json::Value>,

    pub event_type: &'static str,
}

impl WideEvent {
    /// Start a record for a new request.
    pub fn builder(
        request_id: impl Into<String>,
        trace_id: impl Into<String>,
        service: ServiceInfo,
    ) -> WideEventBuilder {
        WideEventBuilder {
            event: WideEvent {
                request_id: request_id.into(),
                trace_id: trace_id.into(),
                timestamp: chrono::Utc::now()
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                service,
                http: HttpFacet::default(),
                user: UserFacet::default(),
                action: None,
                cart: CartFacet::default(),
                payment: PaymentFacet::default(),
                outcome: None,
                error: ErrorFacet::default(),
                feature_flags: BTreeMap::new(),
                custom: BTreeMap::new(),
                event_type: EVENT_TYPE,
            },
        }
    }
}

/// Mutable accumulator for the in-flight request.
///
/// Setters return `&mut Self` so calls can be chained. Status, duration and
/// outcome are reserved for the request boundary.
#[derive(Debug, Clone)]
pub struct WideEventBuilder {
    event: WideEvent,
}

impl WideEventBuilder {
    pub fn request_id(&self) -> &str {
        &self.event.request_id
    }

    pub fn trace_id(&self) -> &str {
        &self.event.trace_id
    }

    /// Read-only view of everything accumulated so far.
    pub fn peek(&self) -> &WideEvent {
        &self.event
    }

    pub fn http_request(&mut self, method: impl Into<String>, path: impl Into<String>) -> &mut Self {
        self.event.http.http_method = Some(method.into());
        self.event.http.http_path = Some(path.into());
        self
    }

    pub fn user_id(&mut self, user_id: impl Into<String>) -> &mut Self {
        self.event.user.user_id = Some(user_id.into());
        self
    }

    pub fn user_subscription(&mut self, tier: impl Into<String>) -> &mut Self {
        self.event.user.user_subscription = Some(tier.into());
        self
    }

    pub fn user_account_age_days(&mut self, days: u32) -> &mut Self {
        self.event.user.user_account_age_days = Some(days);
        self
    }

    pub fn user_lifetime_value_cents(&mut self, cents: u64) -> &mut Self {
        self.event.user.user_lifetime_value_cents = Some(cents);
        self
    }

    pub fn action(&mut self, action: impl Into<String>) -> &mut Self {
        self.event.action = Some(action.into());
        self
    }

    pub fn cart_id(&mut self, cart_id: impl Into<String>) -> &mut Self {
        self.event.cart.cart_id = Some(cart_id.into());
        self
    }

    pub fn cart_item_count(&mut self, count: u32) -> &mut Self {
        self.event.cart.cart_item_count = Some(count);
        self
    }

    pub fn cart_total_cents(&mut self, cents: u64) -> &mut Self {
        self.event.cart.cart_total_cents = Some(cents);
        self
    }

    pub fn coupon(&mut self, code: impl Into<String>, discount_percent: u32) -> &mut Self {
        self.event.cart.coupon_code = Some(code.into());
        self.event.cart.coupon_discount_percent = Some(discount_percent);
        self
    }

    pub fn payment_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.event.payment.payment_method = Some(method.into());
        self
    }

    pub fn payment_provider(&mut self, provider: impl Into<String>) -> &mut Self {
        self.event.payment.payment_provider = Some(provider.into());
        self
    }

    pub fn payment_latency_ms(&mut self, latency_ms: u64) -> &mut Self {
        self.event.payment.payment_latency_ms = Some(latency_ms);
        self
    }

    pub fn payment_attempt(&mut self, attempt: u32) -> &mut Self {
        self.event.payment.payment_attempt = Some(attempt);
        self
    }

    pub fn error_type(&mut self, error_type: impl Into<String>) -> &mut Self {
        self.event.error.error_type = Some(error_type.into());
        self
    }

    pub fn error_code(&mut self, code: impl Into<String>) -> &mut Self {
        self.event.error.error_code = Some(code.into());
        self
    }

    pub fn error_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.event.error.error_message = Some(message.into());
        self
    }

    pub fn error_retriable(&mut self, retriable: bool) -> &mut Self {
        self.event.error.error_retriable = Some(retriable);
        self
    }

    pub fn feature_flag(&mut self, name: impl Into<String>, enabled: bool) -> &mut Self {
        self.event.feature_flags.insert(name.into(), enabled);
        self
    }

    pub fn feature_flags<I, K>(&mut self, flags: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        for (name, enabled) in flags {
            self.event.feature_flags.insert(name.into(), enabled);
        }
        self
    }

    /// Attach an attribute that has no dedicated field.
    pub fn custom(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> &mut Self {
        self.event.custom.insert(key.into(), value.into());
        self
    }

    /// Record the status of the response that is about to be sent.
    pub(crate) fn http_status(&mut self, status: u16) -> &mut Self {
        self.event.http.http_status = Some(status);
        self.event.outcome = Some(Outcome::from_status(status));
        self
    }

    /// Record a failure that escaped the handler.
    pub(crate) fn unhandled_failure(&mut self, kind: &str, message: &str) -> &mut Self {
        self.event.http.http_status = Some(500);
        self.event.outcome = Some(Outcome::Error);
        self.event.error.error_type = Some(kind.to_string());
        self.event.error.error_message = Some(message.to_string());
        self
    }

    pub(crate) fn has_status(&self) -> bool {
        self.event.http.http_status.is_some()
    }

    /// Fill the remaining required fields and freeze the record.
    pub(crate) fn finish(mut self, duration_ms: u64) -> WideEvent {
        self.event.http.duration_ms = Some(duration_ms);
        if self.event.http.http_status.is_none() {
            self.event.http.http_status = Some(500);
        }
        if self.event.outcome.is_none() {
            let status = self.event.http.http_status.unwrap_or(500);
            self.event.outcome = Some(Outcome::from_status(status));
        }
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ServiceInfo {
        ServiceInfo {
            service: "checkout-service".into(),
            version: "1.0.0".into(),
            region: "us-east-1".into(),
            environment: "test".into(),
        }
    }

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(Outcome::from_status(200), Outcome::Success);
        assert_eq!(Outcome::from_status(399), Outcome::Success);
        assert_eq!(Outcome::from_status(400), Outcome::Error);
        assert_eq!(Outcome::from_status(422), Outcome::Error);
    }

    #[test]
    fn test_finish_fills_required_fields() {
        let mut builder = WideEvent::builder("abcd1234", "f".repeat(32), service());
        builder.http_status(201);
        let event = builder.finish(42);

        assert_eq!(event.http.http_status, Some(201));
        assert_eq!(event.http.duration_ms, Some(42));
        assert_eq!(event.outcome, Some(Outcome::Success));
        assert_eq!(event.event_type, EVENT_TYPE);
    }

    #[test]
    fn test_finish_without_status_falls_back_to_500() {
        let builder = WideEvent::builder("abcd1234", "trace", service());
        let event = builder.finish(5);

        assert_eq!(event.http.http_status, Some(500));
        assert_eq!(event.outcome, Some(Outcome::Error));
    }

    #[test]
    fn test_unhandled_failure_keeps_business_error_code() {
        let mut builder = WideEvent::builder("abcd1234", "trace", service());
        builder.error_code("card_declined");
        builder.unhandled_failure("panic", "boom");
        let event = builder.finish(1);

        assert_eq!(event.error.error_code.as_deref(), Some("card_declined"));
        assert_eq!(event.error.error_type.as_deref(), Some("panic"));
        assert_eq!(event.error.error_message.as_deref(), Some("boom"));
        assert_eq!(event.http.http_status, Some(500));
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let mut builder = WideEvent::builder("abcd1234", "trace", service());
        builder.cart_id("cart_1").cart_total_cents(50_000);
        let json = serde_json::to_value(builder.finish(3)).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["cart_total_cents"], 50_000);
        assert!(!obj.contains_key("coupon_code"));
        assert!(!obj.contains_key("user_id"));
        assert!(!obj.contains_key("feature_flags"));
        assert!(!obj.contains_key("error_type"));
        assert_eq!(obj["outcome"], "error");
    }
}

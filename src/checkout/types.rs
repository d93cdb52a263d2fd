//! Checkout domain types.

use serde::{Deserialize, Serialize};

pub const SUBSCRIPTIONS: [&str; 4] = ["free", "basic", "premium", "enterprise"];
pub const PAYMENT_METHODS: [&str; 4] = ["credit_card", "debit_card", "pix", "boleto"];
pub const PROVIDERS: [&str; 4] = ["stripe", "pagseguro", "mercadopago", "cielo"];

/// Coupon draw table; `None` entries mean no coupon.
pub const COUPONS: [Option<&str>; 7] = [
    None,
    None,
    None,
    Some("SAVE10"),
    Some("FIRST20"),
    Some("BLACK50"),
    Some("WELCOME15"),
];

/// Error type recorded for every declined payment.
pub const PAYMENT_ERROR_TYPE: &str = "PaymentException";

/// Reasons a payment provider declines a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    CardDeclined,
    InsufficientFunds,
    ExpiredCard,
    ProviderTimeout,
    FraudSuspected,
}

impl PaymentErrorCode {
    pub const ALL: [PaymentErrorCode; 5] = [
        PaymentErrorCode::CardDeclined,
        PaymentErrorCode::InsufficientFunds,
        PaymentErrorCode::ExpiredCard,
        PaymentErrorCode::ProviderTimeout,
        PaymentErrorCode::FraudSuspected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::InsufficientFunds => "insufficient_funds",
            PaymentErrorCode::ExpiredCard => "expired_card",
            PaymentErrorCode::ProviderTimeout => "provider_timeout",
            PaymentErrorCode::FraudSuspected => "fraud_suspected",
        }
    }

    /// Fraud blocks are final; everything else may succeed on retry.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, PaymentErrorCode::FraudSuspected)
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every decision for one checkout, drawn before any work happens.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub user_id: String,
    pub subscription: &'static str,
    pub account_age_days: u32,
    pub lifetime_value_cents: u64,

    pub cart_id: String,
    pub item_count: u32,
    pub total_cents: u64,
    pub coupon: Option<&'static str>,

    pub feature_flags: Vec<(&'static str, bool)>,

    pub payment_method: &'static str,
    pub provider: &'static str,
    pub attempt: u32,
    pub latency_ms: u64,

    /// `Some` when the provider declines the payment.
    pub failure: Option<PaymentErrorCode>,
    pub order_id: String,
}

/// JSON body returned by `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PaymentErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub cart_id: String,
}

impl CheckoutResponse {
    pub fn completed(order_id: String, cart_id: String, total_cents: u64) -> Self {
        Self {
            success: true,
            order_id: Some(order_id),
            total_cents: Some(total_cents),
            error: None,
            request_id: None,
            cart_id,
        }
    }

    pub fn declined(code: PaymentErrorCode, cart_id: String, request_id: String) -> Self {
        Self {
            success: false,
            order_id: None,
            total_cents: None,
            error: Some(code),
            request_id: Some(request_id),
            cart_id,
        }
    }
}

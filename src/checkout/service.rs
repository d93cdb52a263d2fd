//! Simulated checkout flow.
//!
//! Draws a [`CheckoutPlan`] up front, then plays it out against the
//! request's wide event: user, cart, coupon, flags and payment details are
//! recorded as they become known, the payment wait is simulated, and the
//! decline (if any) is recorded with structured error fields.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::checkout::types::{
    CheckoutPlan, CheckoutResponse, PaymentErrorCode, COUPONS, PAYMENT_ERROR_TYPE,
    PAYMENT_METHODS, PROVIDERS, SUBSCRIPTIONS,
};
use crate::config::CheckoutConfig;
use crate::event::{ContextError, RequestContext};

/// Fallback user id when the caller did not identify itself.
pub fn random_user_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("user_{}", rng.gen_range(1000..9999))
}

/// Discount encoded in a coupon code (`BLACK50` → 50).
pub fn coupon_discount(code: &str) -> u32 {
    code.chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Typical provider response time before jitter.
pub fn base_latency_ms(provider: &str) -> i64 {
    match provider {
        "stripe" => 150,
        "pagseguro" => 300,
        "mercadopago" => 250,
        "cielo" => 200,
        _ => 200,
    }
}

/// Probability that a payment with these attributes is declined.
pub fn error_rate(subscription: &str, provider: &str, attempt: u32, total_cents: u64) -> f64 {
    let mut rate = 0.08;

    match provider {
        "cielo" => rate += 0.07,
        "mercadopago" => rate += 0.04,
        _ => {}
    }
    if attempt > 1 {
        rate += 0.15;
    }
    if total_cents > 100_000 {
        rate += 0.10;
    }
    if subscription == "premium" || subscription == "enterprise" {
        rate -= 0.03;
    }

    f64::min(rate, 0.5)
}

fn pick<R: Rng + ?Sized, T: Copy>(rng: &mut R, items: &[T]) -> T {
    // Callers only pass the non-empty constant tables.
    *items.choose(rng).unwrap_or(&items[0])
}

impl CheckoutPlan {
    /// Draw a random checkout, honouring a caller-supplied user id.
    pub fn random<R: Rng + ?Sized>(user_id: Option<&str>, rng: &mut R) -> Self {
        let user_id = match user_id {
            Some(id) => id.to_string(),
            None => random_user_id(rng),
        };
        let subscription = pick(rng, &SUBSCRIPTIONS);
        let account_age_days = rng.gen_range(1..1500);
        let lifetime_value_cents = rng.gen_range(0..500_000);

        let cart_id = format!("cart_{}", rng.gen_range(10000..99999));
        let item_count = rng.gen_range(1..8);
        let total_cents = rng.gen_range(999..150_000);
        let coupon = pick(rng, &COUPONS);

        let feature_flags = vec![
            ("new_checkout_flow", rng.gen_bool(0.5)),
            ("express_payment", rng.gen_bool(0.3)),
            ("smart_retry", rng.gen_bool(0.5)),
        ];

        let payment_method = pick(rng, &PAYMENT_METHODS);
        let provider = pick(rng, &PROVIDERS);
        let attempt = if rng.gen_bool(0.2) { rng.gen_range(2..4) } else { 1 };
        let jitter: i64 = rng.gen_range(-50..500);
        let latency_ms = (base_latency_ms(provider) + jitter).max(50) as u64;

        let declined = rng.gen::<f64>() < error_rate(subscription, provider, attempt, total_cents);
        let failure = declined.then(|| pick(rng, &PaymentErrorCode::ALL));
        let order_id = format!("order_{}", rng.gen_range(100000..999999));

        Self {
            user_id,
            subscription,
            account_age_days,
            lifetime_value_cents,
            cart_id,
            item_count,
            total_cents,
            coupon,
            feature_flags,
            payment_method,
            provider,
            attempt,
            latency_ms,
            failure,
            order_id,
        }
    }
}

/// Executes checkout plans inside a request.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    max_simulated_latency: Duration,
}

impl CheckoutService {
    pub fn new(config: &CheckoutConfig) -> Self {
        Self {
            max_simulated_latency: Duration::from_millis(config.max_simulated_latency_ms),
        }
    }

    /// Play out `plan`, recording everything on the current wide event.
    ///
    /// A declined payment is a normal result (`success == false`), not an
    /// error. Errors only come from calling this outside a request.
    pub async fn process(&self, plan: &CheckoutPlan) -> Result<CheckoutResponse, ContextError> {
        let request_id = RequestContext::with_current(|event| {
            event
                .user_id(plan.user_id.as_str())
                .user_subscription(plan.subscription)
                .user_account_age_days(plan.account_age_days)
                .user_lifetime_value_cents(plan.lifetime_value_cents)
                .action("checkout");

            event
                .cart_id(plan.cart_id.as_str())
                .cart_item_count(plan.item_count)
                .cart_total_cents(plan.total_cents);

            if let Some(code) = plan.coupon {
                event.coupon(code, coupon_discount(code));
            }

            event
                .feature_flags(plan.feature_flags.iter().copied())
                .payment_method(plan.payment_method)
                .payment_provider(plan.provider)
                .payment_latency_ms(plan.latency_ms)
                .payment_attempt(plan.attempt);

            event.request_id().to_string()
        })?;

        tracing::debug!(
            provider = plan.provider,
            latency_ms = plan.latency_ms,
            attempt = plan.attempt,
            "Authorizing payment"
        );
        tokio::time::sleep(Duration::from_millis(plan.latency_ms).min(self.max_simulated_latency)).await;

        match plan.failure {
            Some(code) => {
                RequestContext::with_current(|event| {
                    event
                        .error_type(PAYMENT_ERROR_TYPE)
                        .error_code(code.as_str())
                        .error_message(format!("Payment failed: {}", code))
                        .error_retriable(code.is_retriable());
                })?;
                tracing::info!(error_code = %code, cart_id = %plan.cart_id, "Payment declined");
                Ok(CheckoutResponse::declined(code, plan.cart_id.clone(), request_id))
            }
            None => Ok(CheckoutResponse::completed(
                plan.order_id.clone(),
                plan.cart_id.clone(),
                plan.total_cents,
            )),
        }
    }
}

//! Stripe Webhook Events
//!
//! Parses verified webhook payloads into the events the reconciler acts on.
//! Event types and payment status use the `stripe` types; only the session
//! fields we need are read, so payloads from any API version parse.

use serde::Deserialize;
use stripe::{CheckoutSessionPaymentStatus, EventType};

use crate::error::{PaymentError, Result};

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Checkout paid - upgrade the paying account
    CheckoutCompleted {
        event_id: String,
        session_id: String,
        customer_email: Option<String>,
    },

    /// Checkout completed with a delayed payment method that has not settled
    ///
    /// A later `checkout.session.async_payment_succeeded` confirms it.
    PaymentPending { event_id: String, session_id: String },

    /// Unhandled event type
    Other { event_id: String, event_type: String },
}

impl WebhookEvent {
    pub fn event_id(&self) -> &str {
        match self {
            Self::CheckoutCompleted { event_id, .. }
            | Self::PaymentPending { event_id, .. }
            | Self::Other { event_id, .. } => event_id,
        }
    }

    /// Parse a (verified) webhook payload
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        let object = raw.data.object;
        let session_id = object.id.unwrap_or_default();

        match raw.event_type {
            EventType::CheckoutSessionCompleted
                if object.payment_status == Some(CheckoutSessionPaymentStatus::Unpaid) =>
            {
                Ok(Self::PaymentPending {
                    event_id: raw.id,
                    session_id,
                })
            }
            EventType::CheckoutSessionCompleted | EventType::CheckoutSessionAsyncPaymentSucceeded => {
                let customer_email = object
                    .customer_email
                    .or_else(|| object.customer_details.and_then(|details| details.email))
                    .filter(|email| !email.trim().is_empty());

                Ok(Self::CheckoutCompleted {
                    event_id: raw.id,
                    session_id,
                    customer_email,
                })
            }
            other => Ok(Self::Other {
                event_id: raw.id,
                event_type: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: EventType,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    #[serde(default)]
    object: RawEventObject,
}

#[derive(Debug, Default, Deserialize)]
struct RawEventObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<RawCustomerDetails>,
    #[serde(default)]
    payment_status: Option<CheckoutSessionPaymentStatus>,
}

#[derive(Debug, Deserialize)]
struct RawCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checkout_completed() {
        let payload = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "customer_email": "a@example.com", "payment_status": "paid"}}
        }"#;

        assert_eq!(
            WebhookEvent::parse(payload).unwrap(),
            WebhookEvent::CheckoutCompleted {
                event_id: "evt_1".into(),
                session_id: "cs_1".into(),
                customer_email: Some("a@example.com".into()),
            }
        );
    }

    #[test]
    fn test_email_falls_back_to_customer_details() {
        let payload = br#"{
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_2", "customer_email": null,
                                "customer_details": {"email": "b@example.com"}}}
        }"#;

        let WebhookEvent::CheckoutCompleted { customer_email, .. } =
            WebhookEvent::parse(payload).unwrap()
        else {
            panic!("expected checkout completed");
        };
        assert_eq!(customer_email.as_deref(), Some("b@example.com"));
    }

    #[test]
    fn test_unpaid_checkout_is_pending() {
        let payload = br#"{
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_3", "customer_email": "c@example.com", "payment_status": "unpaid"}}
        }"#;
        assert!(matches!(
            WebhookEvent::parse(payload).unwrap(),
            WebhookEvent::PaymentPending { .. }
        ));
    }

    #[test]
    fn test_other_events() {
        let payload = br#"{"id": "evt_4", "type": "invoice.paid", "data": {"object": {"id": "in_1", "amount_due": 500}}}"#;
        let event = WebhookEvent::parse(payload).unwrap();
        assert_eq!(event.event_id(), "evt_4");
        assert!(matches!(event, WebhookEvent::Other { ref event_type, .. } if event_type == "invoice.paid"));
    }

    #[test]
    fn test_async_payment_succeeded_completes_checkout() {
        let payload = br#"{
            "id": "evt_5",
            "type": "checkout.session.async_payment_succeeded",
            "data": {"object": {"id": "cs_5", "customer_email": "e@example.com", "payment_status": "paid"}}
        }"#;
        assert!(matches!(
            WebhookEvent::parse(payload).unwrap(),
            WebhookEvent::CheckoutCompleted { ref customer_email, .. }
                if customer_email.as_deref() == Some("e@example.com")
        ));
    }

    #[test]
    fn test_unrecognised_event_type_is_other() {
        let payload = br#"{"id": "evt_6", "type": "some.future.event", "data": {"object": {}}}"#;
        assert!(matches!(
            WebhookEvent::parse(payload).unwrap(),
            WebhookEvent::Other { ref event_id, .. } if event_id == "evt_6"
        ));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            WebhookEvent::parse(b"not json"),
            Err(PaymentError::WebhookParse(_))
        ));
    }
}

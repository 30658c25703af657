use club_domain::webhook::WebhookEnvelope;

pub const MAX_EVENTS_PER_ENVELOPE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeError {
    TooManyEvents,
}

impl EnvelopeError {
    pub fn message(self) -> &'static str {
        match self {
            EnvelopeError::TooManyEvents => "payload exceeds 100 events",
        }
    }
}

/// Spec §4.9 step 2: reject payloads with more than 100 events. A payload
/// without an `events` array is already rejected at JSON-parse time since
/// `WebhookEnvelope::events` is a required field.
pub fn validate_envelope(envelope: &WebhookEnvelope) -> Result<(), EnvelopeError> {
    if envelope.events.len() > MAX_EVENTS_PER_ENVELOPE {
        return Err(EnvelopeError::TooManyEvents);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_domain::webhook::{WebhookEvent, WebhookResource};
    use chrono::Utc;

    fn sample_event() -> WebhookEvent {
        WebhookEvent {
            id: "evt_1".to_string(),
            resource: WebhookResource::Payments,
            action: "confirmed".to_string(),
            links: Default::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_more_than_100_events() {
        let envelope = WebhookEnvelope {
            events: std::iter::repeat_with(sample_event).take(101).collect(),
        };
        assert_eq!(validate_envelope(&envelope).unwrap_err(), EnvelopeError::TooManyEvents);
    }

    #[test]
    fn accepts_exactly_100_events() {
        let envelope = WebhookEnvelope {
            events: std::iter::repeat_with(sample_event).take(100).collect(),
        };
        assert!(validate_envelope(&envelope).is_ok());
    }
}

use chrono::{DateTime, Datelike, Utc};

use club_domain::record::RegistrationStatus;
use club_domain::webhook::{EventResult, EventStatus, WebhookEvent, WebhookResource};
use club_providers::{PaymentProvider, RecordTable};

fn billing_request_id(event: &WebhookEvent) -> Option<&str> {
    event
        .links
        .get("billing_request_id")
        .or_else(|| event.links.get("billing_request"))
        .map(String::as_str)
}

fn ignored(event: &WebhookEvent, reason: impl Into<String>) -> EventResult {
    EventResult {
        id: event.id.clone(),
        status: EventStatus::Ignored,
        reason: Some(reason.into()),
    }
}

fn failed(event: &WebhookEvent, reason: impl Into<String>) -> EventResult {
    EventResult {
        id: event.id.clone(),
        status: EventStatus::Failed,
        reason: Some(reason.into()),
    }
}

fn processed(event: &WebhookEvent) -> EventResult {
    EventResult {
        id: event.id.clone(),
        status: EventStatus::Processed,
        reason: None,
    }
}

/// Season month label used as a `monthly_payment_status` key, e.g. `september_2025`.
fn season_month_key(date: DateTime<Utc>) -> String {
    let month_name = match date.month() {
        1 => "january",
        2 => "february",
        3 => "march",
        4 => "april",
        5 => "may",
        9 => "september",
        10 => "october",
        11 => "november",
        12 => "december",
        _ => "out_of_season",
    };
    format!("{month_name}_{}", date.year())
}

/// Query for an active sibling (spec §4.9 sibling-discount rule) and apply
/// the flat 10% discount to `base_monthly` if one is found. On query failure
/// proceeds without a discount rather than blocking activation.
async fn apply_sibling_discount(
    record_table: &dyn RecordTable,
    parent_full_name: &str,
    player_last_name: &str,
    exclude_billing_request_id: &str,
    base_monthly: f64,
) -> (f64, bool) {
    match record_table
        .find_active_siblings(parent_full_name, player_last_name, exclude_billing_request_id)
        .await
    {
        Ok(siblings) if !siblings.is_empty() => (round_pounds(base_monthly * 0.9), true),
        Ok(_) => (base_monthly, false),
        Err(e) => {
            tracing::warn!(error = %e, "sibling discount lookup failed, proceeding without discount");
            (base_monthly, false)
        }
    }
}

fn round_pounds(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

async fn activate_subscription(
    record_table: &dyn RecordTable,
    payment: &dyn PaymentProvider,
    event: &WebhookEvent,
    billing_request_id: &str,
) -> EventResult {
    let mut record = match record_table.get(billing_request_id).await {
        Ok(Some(r)) => r,
        Ok(None) => return failed(event, "record_missing"),
        Err(e) => return failed(event, e.to_string()),
    };

    if record.subscription_activated {
        return ignored(event, "already activated");
    }

    let (monthly, discount_applied) = apply_sibling_discount(
        record_table,
        &record.parent_full_name,
        record.player_last_name(),
        &record.billing_request_id,
        record.monthly_amount,
    )
    .await;

    let plan = club_subscription::compute_plan(event.created_at.date_naive(), record.preferred_payment_day);

    let interim = if plan.create_interim {
        plan.interim_start.zip(plan.interim_end)
    } else {
        None
    };

    let subscription_ids = match payment
        .create_subscription(billing_request_id, monthly, plan.ongoing_start_date, plan.end_date, interim)
        .await
    {
        Ok(ids) => ids,
        Err(e) => return failed(event, e.to_string()),
    };

    record.monthly_amount = monthly;
    record.sibling_discount_applied = discount_applied;
    record.subscription_id = Some(subscription_ids.subscription_id);
    record.interim_subscription_id = subscription_ids.interim_subscription_id;
    record.interim_start = plan.interim_start.map(|d| d.to_string());
    record.interim_end = plan.interim_end.map(|d| d.to_string());
    record.subscription_activated = true;
    record.registration_status = RegistrationStatus::Active;

    match record_table.upsert(record).await {
        Ok(_) => processed(event),
        Err(e) => failed(event, e.to_string()),
    }
}

pub async fn process_event(
    record_table: &dyn RecordTable,
    payment: &dyn PaymentProvider,
    event: &WebhookEvent,
) -> EventResult {
    let Some(billing_request_id) = billing_request_id(event).map(str::to_string) else {
        return failed(event, "missing billing_request_id link");
    };

    match (event.resource, event.action.as_str()) {
        (WebhookResource::Payments, "confirmed") => {
            let mut record = match record_table.get(&billing_request_id).await {
                Ok(Some(r)) => r,
                Ok(None) => return failed(event, "record_missing"),
                Err(e) => return failed(event, e.to_string()),
            };
            if record.signing_fee_paid {
                return ignored(event, "already processed");
            }
            record.signing_fee_paid = true;
            record.payment_id = Some(billing_request_id.clone());
            if record.registration_status == RegistrationStatus::Pending {
                record.registration_status = RegistrationStatus::Incomplete;
            }
            match record_table.upsert(record).await {
                Ok(_) => processed(event),
                Err(e) => failed(event, e.to_string()),
            }
        }

        (WebhookResource::Mandates, "active") => {
            let mandate_set_now = {
                let mut record = match record_table.get(&billing_request_id).await {
                    Ok(Some(r)) => r,
                    Ok(None) => return failed(event, "record_missing"),
                    Err(e) => return failed(event, e.to_string()),
                };
                if record.mandate_authorised {
                    false
                } else {
                    record.mandate_authorised = true;
                    record.mandate_id = Some(billing_request_id.clone());
                    if let Err(e) = record_table.upsert(record).await {
                        return failed(event, e.to_string());
                    }
                    true
                }
            };
            if !mandate_set_now {
                return ignored(event, "mandate already authorised");
            }
            activate_subscription(record_table, payment, event, &billing_request_id).await
        }

        (WebhookResource::BillingRequests, "fulfilled") => {
            activate_subscription(record_table, payment, event, &billing_request_id).await
        }

        (WebhookResource::Subscriptions, "payment_created") => {
            let mut record = match record_table.get(&billing_request_id).await {
                Ok(Some(r)) => r,
                Ok(None) => return failed(event, "record_missing"),
                Err(e) => return failed(event, e.to_string()),
            };
            let key = season_month_key(event.created_at);
            record.monthly_payment_status.insert(key, "paid".to_string());
            match record_table.upsert(record).await {
                Ok(_) => processed(event),
                Err(e) => failed(event, e.to_string()),
            }
        }

        (WebhookResource::Subscriptions, "created") => processed(event),

        (WebhookResource::Subscriptions, "cancelled") => {
            let mut record = match record_table.get(&billing_request_id).await {
                Ok(Some(r)) => r,
                Ok(None) => return failed(event, "record_missing"),
                Err(e) => return failed(event, e.to_string()),
            };
            if record.registration_status == RegistrationStatus::Active {
                record.registration_status = RegistrationStatus::Suspended;
                if let Err(e) = record_table.upsert(record).await {
                    return failed(event, e.to_string());
                }
            }
            processed(event)
        }

        (resource, action) => ignored(event, format!("unhandled event {resource:?}/{action}")),
    }
}

pub async fn process_envelope(
    record_table: &dyn RecordTable,
    payment: &dyn PaymentProvider,
    events: &[WebhookEvent],
) -> Vec<EventResult> {
    let mut results = Vec::with_capacity(events.len());
    for event in events {
        results.push(process_event(record_table, payment, event).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_domain::record::RegistrationRecord;
    use club_providers::{FakePaymentProvider, InMemoryRecordTable};
    use std::collections::HashMap;

    fn event(resource: WebhookResource, action: &str, billing_request_id: &str) -> WebhookEvent {
        let mut links = HashMap::new();
        links.insert("billing_request_id".to_string(), billing_request_id.to_string());
        WebhookEvent {
            id: format!("evt_{action}"),
            resource,
            action: action.to_string(),
            links,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn payment_confirmed_moves_pending_to_incomplete() {
        let table = InMemoryRecordTable::new();
        let mut record = RegistrationRecord::new("br_1");
        record.registration_status = RegistrationStatus::Pending;
        table.seed_record(record);
        let payment = FakePaymentProvider;

        let result = process_event(&table, &payment, &event(WebhookResource::Payments, "confirmed", "br_1")).await;
        assert_eq!(result.status, EventStatus::Processed);

        let updated = table.get("br_1").await.unwrap().unwrap();
        assert!(updated.signing_fee_paid);
        assert_eq!(updated.registration_status, RegistrationStatus::Incomplete);
    }

    #[tokio::test]
    async fn duplicate_payment_confirmed_is_idempotent() {
        let table = InMemoryRecordTable::new();
        let mut record = RegistrationRecord::new("br_1");
        record.signing_fee_paid = true;
        record.registration_status = RegistrationStatus::Active;
        table.seed_record(record);
        let payment = FakePaymentProvider;

        let result = process_event(&table, &payment, &event(WebhookResource::Payments, "confirmed", "br_1")).await;
        assert_eq!(result.status, EventStatus::Ignored);

        let updated = table.get("br_1").await.unwrap().unwrap();
        assert_eq!(updated.registration_status, RegistrationStatus::Active);
    }

    #[tokio::test]
    async fn mandate_active_activates_subscription() {
        let table = InMemoryRecordTable::new();
        let mut record = RegistrationRecord::new("br_1");
        record.preferred_payment_day = 10;
        record.monthly_amount = 27.50;
        record.parent_full_name = "John Smith".to_string();
        record.player_full_name = "Alice Smith".to_string();
        table.seed_record(record);
        let payment = FakePaymentProvider;

        let result = process_event(&table, &payment, &event(WebhookResource::Mandates, "active", "br_1")).await;
        assert_eq!(result.status, EventStatus::Processed);

        let updated = table.get("br_1").await.unwrap().unwrap();
        assert!(updated.subscription_activated);
        assert_eq!(updated.registration_status, RegistrationStatus::Active);
        assert!(!updated.sibling_discount_applied);
    }

    #[tokio::test]
    async fn sibling_discount_applied_when_active_sibling_exists() {
        let table = InMemoryRecordTable::new();

        let mut sibling = RegistrationRecord::new("br_sibling");
        sibling.parent_full_name = "John Smith".to_string();
        sibling.player_full_name = "Alice Smith".to_string();
        sibling.registration_status = RegistrationStatus::Active;
        table.seed_record(sibling);

        let mut record = RegistrationRecord::new("br_2");
        record.preferred_payment_day = 10;
        record.monthly_amount = 30.0;
        record.parent_full_name = "John Smith".to_string();
        record.player_full_name = "Bobby Smith".to_string();
        table.seed_record(record);

        let payment = FakePaymentProvider;
        let result = process_event(&table, &payment, &event(WebhookResource::Mandates, "active", "br_2")).await;
        assert_eq!(result.status, EventStatus::Processed);

        let updated = table.get("br_2").await.unwrap().unwrap();
        assert!(updated.sibling_discount_applied);
        assert_eq!(updated.monthly_amount, 27.0);
    }

    #[tokio::test]
    async fn subscription_payment_created_sets_monthly_status() {
        let table = InMemoryRecordTable::new();
        table.seed_record(RegistrationRecord::new("br_1"));
        let payment = FakePaymentProvider;

        let result = process_event(
            &table,
            &payment,
            &event(WebhookResource::Subscriptions, "payment_created", "br_1"),
        )
        .await;
        assert_eq!(result.status, EventStatus::Processed);

        let updated = table.get("br_1").await.unwrap().unwrap();
        assert!(updated.monthly_payment_status.values().any(|v| v == "paid"));
    }

    #[tokio::test]
    async fn unknown_action_is_ignored() {
        let table = InMemoryRecordTable::new();
        table.seed_record(RegistrationRecord::new("br_1"));
        let payment = FakePaymentProvider;

        let result = process_event(&table, &payment, &event(WebhookResource::Subscriptions, "weird", "br_1")).await;
        assert_eq!(result.status, EventStatus::Ignored);
    }
}

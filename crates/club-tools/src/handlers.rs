use serde_json::json;

use club_providers::{AddressLookupProvider, ObjectStore, PaymentProvider, RecordTable, SmsProvider};

use crate::outcome::{get_bool, get_i64, get_str, get_str_opt, ToolOutcome};
use crate::validation;

pub fn person_name_validation(args: &serde_json::Value) -> ToolOutcome {
    let name = match get_str(args, "name") {
        Ok(n) => n,
        Err(out) => return out,
    };
    match validation::validate_person_name(name) {
        Ok(out) => ToolOutcome::ok(json!({ "valid": true, "normalized": out.normalized })),
        Err(e) => ToolOutcome::err(e.kind(), json!({ "valid": false })),
    }
}

pub fn child_dob_validation(args: &serde_json::Value) -> ToolOutcome {
    let dob = match get_str(args, "dob") {
        Ok(n) => n,
        Err(out) => return out,
    };
    match validation::validate_child_dob(dob) {
        Ok(out) => ToolOutcome::ok(json!({
            "valid": true,
            "iso_date": out.iso_date,
            "formatted": out.formatted,
            "birth_year": out.birth_year,
            "age_group": out.age_group,
        })),
        Err(e) => ToolOutcome::err(e.kind(), json!({ "valid": false })),
    }
}

pub fn medical_issues_validation(args: &serde_json::Value) -> ToolOutcome {
    let has_issues = match get_bool(args, "has_medical_issues") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let details = get_str_opt(args, "details");
    match validation::validate_medical_issues(has_issues, details) {
        Ok(out) => ToolOutcome::ok(json!({ "normalized": out.normalized })),
        Err(e) => ToolOutcome::err(e.kind(), json!({ "needs_followup": true })),
    }
}

pub async fn address_lookup(provider: &dyn AddressLookupProvider, args: &serde_json::Value) -> ToolOutcome {
    let postcode = match get_str(args, "postcode") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let house = match get_str(args, "house") {
        Ok(v) => v,
        Err(out) => return out,
    };
    match provider.lookup(postcode, house).await {
        Ok(addr) => ToolOutcome::ok(json!({
            "formatted_address": addr.formatted_address,
            "components": addr.components,
            "confidence": format!("{:?}", addr.confidence).to_lowercase(),
        })),
        Err(e) if e.is_retryable() => ToolOutcome::err_msg("provider_unavailable", e.to_string()),
        Err(e) => ToolOutcome::err_msg("not_found", e.to_string()),
    }
}

pub fn address_validation(args: &serde_json::Value) -> ToolOutcome {
    let full_address = match get_str(args, "full_address") {
        Ok(v) => v,
        Err(out) => return out,
    };
    match validation::validate_address_in_area(full_address) {
        Ok(()) => ToolOutcome::ok(json!({ "valid": true })),
        Err(e) => ToolOutcome::err(e.kind(), json!({ "valid": false })),
    }
}

pub async fn check_if_record_exists_in_db(table: &dyn RecordTable, args: &serde_json::Value) -> ToolOutcome {
    let parent_name = match get_str(args, "parent_name") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let child_name = match get_str(args, "child_name") {
        Ok(v) => v,
        Err(out) => return out,
    };
    match table.find_by_parent_and_child(parent_name, child_name).await {
        Ok(Some(found)) => ToolOutcome::ok(json!({
            "found": true,
            "record_id": found.record_id,
            "played_last_season": found.played_last_season,
        })),
        Ok(None) => ToolOutcome::ok(json!({ "found": false })),
        Err(e) => ToolOutcome::err_msg("db_unavailable", e.to_string()),
    }
}

pub async fn check_if_kit_needed(table: &dyn RecordTable, args: &serde_json::Value) -> ToolOutcome {
    let team = match get_str(args, "team") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let age_group = match get_str(args, "age_group") {
        Ok(v) => v,
        Err(out) => return out,
    };
    match table.kit_needed(team, age_group).await {
        Ok(needed) => ToolOutcome::ok(json!({ "kit_needed": needed })),
        Err(e) => ToolOutcome::err_msg("db_unavailable", e.to_string()),
    }
}

pub async fn check_shirt_number_availability(table: &dyn RecordTable, args: &serde_json::Value) -> ToolOutcome {
    let team = match get_str(args, "team") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let age_group = match get_str(args, "age_group") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let number = match get_i64(args, "number") {
        Ok(v) => v,
        Err(out) => return out,
    };
    if !(1..=25).contains(&number) {
        return ToolOutcome::err_msg("out_of_range", format!("number {number} out of range [1, 25]"));
    }
    match table.shirt_number_availability(team, age_group, number as u8).await {
        Ok(avail) => ToolOutcome::ok(json!({
            "available": avail.available,
            "conflict_count": avail.conflict_count,
        })),
        Err(e) => ToolOutcome::err_msg("db_unavailable", e.to_string()),
    }
}

pub async fn update_reg_details_to_db(table: &dyn RecordTable, args: &serde_json::Value) -> ToolOutcome {
    let billing_request_id = match get_str(args, "billing_request_id") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let record_value = match args.get("record") {
        Some(v) => v.clone(),
        None => return ToolOutcome::err_msg("validation_failed", "missing required argument: record"),
    };

    let mut record: club_domain::record::RegistrationRecord = match serde_json::from_value(record_value) {
        Ok(r) => r,
        Err(e) => return ToolOutcome::err_msg("validation_failed", e.to_string()),
    };
    record.billing_request_id = billing_request_id.to_string();

    match table.upsert(record).await {
        Ok((record_id, created)) => ToolOutcome::ok(json!({
            "record_id": record_id,
            "action": if created { "created" } else { "updated" },
        })),
        Err(e) => ToolOutcome::err_msg("db_unavailable", e.to_string()),
    }
}

pub async fn update_kit_details_to_db(table: &dyn RecordTable, args: &serde_json::Value) -> ToolOutcome {
    let billing_request_id = match get_str(args, "billing_request_id") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let mut record = match table.get(billing_request_id).await {
        Ok(Some(r)) => r,
        Ok(None) => return ToolOutcome::err_msg("db_unavailable", "record_missing"),
        Err(e) => return ToolOutcome::err_msg("db_unavailable", e.to_string()),
    };

    record.kit.size = get_str_opt(args, "size").map(String::from);
    record.kit.shirt_number = args.get("shirt_number").and_then(|v| v.as_u64()).map(|v| v as u8);
    record.kit.kit_type = get_str_opt(args, "kit_type").map(String::from);

    match table.upsert(record).await {
        Ok(_) => ToolOutcome::ok(json!({ "success": true })),
        Err(e) => ToolOutcome::err_msg("db_unavailable", e.to_string()),
    }
}

pub async fn update_photo_link_to_db(table: &dyn RecordTable, args: &serde_json::Value) -> ToolOutcome {
    let billing_request_id = match get_str(args, "billing_request_id") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let url = match get_str(args, "url") {
        Ok(v) => v,
        Err(out) => return out,
    };

    let mut record = match table.get(billing_request_id).await {
        Ok(Some(r)) => r,
        Ok(None) => return ToolOutcome::err_msg("record_missing", "no record for billing_request_id"),
        Err(e) => return ToolOutcome::err_msg("db_unavailable", e.to_string()),
    };

    record.photo_url = Some(url.to_string());
    record.conversation_snapshot = args.get("conversation_snapshot").cloned();

    match table.upsert(record).await {
        Ok(_) => ToolOutcome::ok(json!({ "success": true })),
        Err(e) => ToolOutcome::err_msg("db_unavailable", e.to_string()),
    }
}

pub async fn create_payment_token(provider: &dyn PaymentProvider, args: &serde_json::Value) -> ToolOutcome {
    let preferred_payment_day = match get_i64(args, "preferred_payment_day") {
        Ok(v) => v,
        Err(out) => return out,
    };
    match provider.create_billing_request(preferred_payment_day as i8).await {
        Ok(req) => ToolOutcome::ok(json!({
            "billing_request_id": req.billing_request_id,
            "payment_url": req.payment_url,
            "signing_fee_pounds": req.signing_fee_pounds,
            "monthly_pounds": req.monthly_pounds,
        })),
        Err(e) if matches!(e, club_domain::error::Error::Validation(_)) => {
            ToolOutcome::err_msg("invalid_day", e.to_string())
        }
        Err(e) => ToolOutcome::err_msg("provider_error", e.to_string()),
    }
}

pub async fn create_signup_payment_link(provider: &dyn PaymentProvider, args: &serde_json::Value) -> ToolOutcome {
    let billing_request_id = match get_str(args, "billing_request_id") {
        Ok(v) => v,
        Err(out) => return out,
    };
    match provider.create_payment_link(billing_request_id).await {
        Ok(url) => ToolOutcome::ok(json!({ "payment_url": url })),
        Err(e) => ToolOutcome::err_msg("provider_error", e.to_string()),
    }
}

pub async fn send_sms_payment_link(provider: &dyn SmsProvider, args: &serde_json::Value) -> ToolOutcome {
    let phone = match get_str(args, "phone") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let payment_url = match get_str(args, "payment_url") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let child_name = match get_str(args, "child_name") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let message = format!("Hi, please complete {child_name}'s club registration payment here: {payment_url}");
    match provider.send(phone, &message).await {
        Ok(message_id) => ToolOutcome::ok(json!({ "message_id": message_id })),
        Err(e) if matches!(e, club_domain::error::Error::Validation(_)) => {
            ToolOutcome::err_msg("invalid_phone", e.to_string())
        }
        Err(e) => ToolOutcome::err_msg("provider_error", e.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn upload_photo_to_s3(
    object_store: &dyn ObjectStore,
    heic_decoder: &dyn club_photo::HeicDecoder,
    args: &serde_json::Value,
) -> ToolOutcome {
    let temp_path = match get_str(args, "temp_path") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let content_type = match get_str(args, "content_type") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let player_name = match get_str(args, "player_name") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let team = match get_str(args, "team") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let age_group = match get_str(args, "age_group") {
        Ok(v) => v,
        Err(out) => return out,
    };
    let season = match get_str(args, "season") {
        Ok(v) => v,
        Err(out) => return out,
    };

    let bytes = match std::fs::read(temp_path) {
        Ok(b) => b,
        Err(e) => return ToolOutcome::err_msg("conversion_failed", e.to_string()),
    };

    if club_photo::validate_upload(content_type, bytes.len()).is_err() {
        return ToolOutcome::err_msg("unsupported_format", "unsupported content type or size");
    }

    let processed = match club_photo::process_image(&bytes, content_type, heic_decoder) {
        Ok(p) => p,
        Err(e) => return ToolOutcome::err_msg(e.kind(), e.to_string()),
    };

    let key = club_photo::key::object_store_key(season, team, age_group, player_name);
    let original_extension = temp_path.rsplit('.').next().unwrap_or("bin");
    let metadata = club_photo::key::photo_metadata(player_name, team, age_group, original_extension, &processed.summary);

    match object_store.put(&key, processed.jpeg_bytes, "image/jpeg", metadata).await {
        Ok(url) => ToolOutcome::ok(json!({ "url": url, "key": key })),
        Err(e) => ToolOutcome::err_msg("store_unavailable", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_name_validation_rejects_single_token() {
        let out = person_name_validation(&json!({ "name": "Bono" }));
        assert!(out.is_error);
        assert_eq!(out.kind, Some("too_few_tokens"));
    }

    #[test]
    fn child_dob_validation_succeeds() {
        let out = child_dob_validation(&json!({ "dob": "2016-09-15" }));
        assert!(!out.is_error);
        assert_eq!(out.payload["age_group"], "U9");
    }

    #[test]
    fn missing_argument_reports_invalid_arguments() {
        let out = child_dob_validation(&json!({}));
        assert!(out.is_error);
        assert_eq!(out.kind, Some("invalid_arguments"));
    }
}

use std::collections::HashSet;

use club_domain::tool::{ToolDefinition, ToolId};
use serde_json::json;

fn schema_for(id: ToolId) -> serde_json::Value {
    match id {
        ToolId::PersonNameValidation => json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        }),
        ToolId::ChildDobValidation => json!({
            "type": "object",
            "properties": { "dob": { "type": "string", "description": "Date of birth in any common layout" } },
            "required": ["dob"]
        }),
        ToolId::MedicalIssuesValidation => json!({
            "type": "object",
            "properties": {
                "has_medical_issues": { "type": "boolean" },
                "details": { "type": "string" }
            },
            "required": ["has_medical_issues"]
        }),
        ToolId::AddressLookup => json!({
            "type": "object",
            "properties": {
                "postcode": { "type": "string" },
                "house": { "type": "string" }
            },
            "required": ["postcode", "house"]
        }),
        ToolId::AddressValidation => json!({
            "type": "object",
            "properties": { "full_address": { "type": "string" } },
            "required": ["full_address"]
        }),
        ToolId::CheckIfRecordExistsInDb => json!({
            "type": "object",
            "properties": {
                "parent_name": { "type": "string" },
                "child_name": { "type": "string" }
            },
            "required": ["parent_name", "child_name"]
        }),
        ToolId::CheckIfKitNeeded => json!({
            "type": "object",
            "properties": {
                "team": { "type": "string" },
                "age_group": { "type": "string" }
            },
            "required": ["team", "age_group"]
        }),
        ToolId::CheckShirtNumberAvailability => json!({
            "type": "object",
            "properties": {
                "team": { "type": "string" },
                "age_group": { "type": "string" },
                "number": { "type": "integer", "minimum": 1, "maximum": 25 }
            },
            "required": ["team", "age_group", "number"]
        }),
        ToolId::UpdateRegDetailsToDb => json!({
            "type": "object",
            "properties": {
                "billing_request_id": { "type": "string" },
                "record": { "type": "object", "description": "Full registration record payload" }
            },
            "required": ["billing_request_id", "record"]
        }),
        ToolId::UpdateKitDetailsToDb => json!({
            "type": "object",
            "properties": {
                "billing_request_id": { "type": "string" },
                "size": { "type": "string" },
                "shirt_number": { "type": "integer" },
                "kit_type": { "type": "string" }
            },
            "required": ["billing_request_id"]
        }),
        ToolId::UpdatePhotoLinkToDb => json!({
            "type": "object",
            "properties": {
                "billing_request_id": { "type": "string" },
                "url": { "type": "string" },
                "conversation_snapshot": { "type": "object" }
            },
            "required": ["billing_request_id", "url"]
        }),
        ToolId::CreatePaymentToken => json!({
            "type": "object",
            "properties": { "preferred_payment_day": { "type": "integer" } },
            "required": ["preferred_payment_day"]
        }),
        ToolId::CreateSignupPaymentLink => json!({
            "type": "object",
            "properties": { "billing_request_id": { "type": "string" } },
            "required": ["billing_request_id"]
        }),
        ToolId::SendSmsPaymentLink => json!({
            "type": "object",
            "properties": {
                "phone": { "type": "string" },
                "payment_url": { "type": "string" },
                "child_name": { "type": "string" }
            },
            "required": ["phone", "payment_url", "child_name"]
        }),
        ToolId::UploadPhotoToS3 => json!({
            "type": "object",
            "properties": {
                "temp_path": { "type": "string" },
                "content_type": { "type": "string" },
                "player_name": { "type": "string" },
                "team": { "type": "string" },
                "age_group": { "type": "string" },
                "season": { "type": "string" },
                "billing_request_id": { "type": "string" }
            },
            "required": ["temp_path", "content_type", "player_name", "team", "age_group", "season", "billing_request_id"]
        }),
    }
}

fn description_for(id: ToolId) -> &'static str {
    match id {
        ToolId::PersonNameValidation => "Validate and normalize a person's full name.",
        ToolId::ChildDobValidation => "Validate a child's date of birth and derive the age group.",
        ToolId::MedicalIssuesValidation => "Validate and normalize reported medical issues.",
        ToolId::AddressLookup => "Look up a full address from postcode and house.",
        ToolId::AddressValidation => "Confirm an address is UK-shaped and within the club's served area.",
        ToolId::CheckIfRecordExistsInDb => "Check whether a registration record already exists for this parent/child.",
        ToolId::CheckIfKitNeeded => "Check whether kit is required for a team/age group this season.",
        ToolId::CheckShirtNumberAvailability => "Check whether a shirt number is available for a team/age group.",
        ToolId::UpdateRegDetailsToDb => "Create or update the registration record.",
        ToolId::UpdateKitDetailsToDb => "Record kit size, shirt number and kit type on the registration.",
        ToolId::UpdatePhotoLinkToDb => "Record the player photo URL and a conversation snapshot.",
        ToolId::CreatePaymentToken => "Create a billing request and payment token for the preferred payment day.",
        ToolId::CreateSignupPaymentLink => "Create the signup payment link for an existing billing request.",
        ToolId::SendSmsPaymentLink => "Send the payment link to the parent's phone by SMS.",
        ToolId::UploadPhotoToS3 => "Convert, optimize and upload the player's photo.",
    }
}

pub fn build_tool_definitions(allowed: &HashSet<ToolId>) -> Vec<ToolDefinition> {
    let mut ids: Vec<ToolId> = allowed.iter().copied().collect();
    ids.sort_by_key(|id| id.name());
    ids.into_iter()
        .map(|id| ToolDefinition {
            name: id.name().to_string(),
            description: description_for(id).to_string(),
            parameters: schema_for(id),
        })
        .collect()
}

use serde::{Deserialize, Serialize};

/// One of the fifteen registered tool identities (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    PersonNameValidation,
    ChildDobValidation,
    MedicalIssuesValidation,
    AddressLookup,
    AddressValidation,
    CheckIfRecordExistsInDb,
    CheckIfKitNeeded,
    CheckShirtNumberAvailability,
    UpdateRegDetailsToDb,
    UpdateKitDetailsToDb,
    UpdatePhotoLinkToDb,
    CreatePaymentToken,
    CreateSignupPaymentLink,
    SendSmsPaymentLink,
    UploadPhotoToS3,
}

impl ToolId {
    pub fn name(self) -> &'static str {
        match self {
            ToolId::PersonNameValidation => "person_name_validation",
            ToolId::ChildDobValidation => "child_dob_validation",
            ToolId::MedicalIssuesValidation => "medical_issues_validation",
            ToolId::AddressLookup => "address_lookup",
            ToolId::AddressValidation => "address_validation",
            ToolId::CheckIfRecordExistsInDb => "check_if_record_exists_in_db",
            ToolId::CheckIfKitNeeded => "check_if_kit_needed",
            ToolId::CheckShirtNumberAvailability => "check_shirt_number_availability",
            ToolId::UpdateRegDetailsToDb => "update_reg_details_to_db",
            ToolId::UpdateKitDetailsToDb => "update_kit_details_to_db",
            ToolId::UpdatePhotoLinkToDb => "update_photo_link_to_db",
            ToolId::CreatePaymentToken => "create_payment_token",
            ToolId::CreateSignupPaymentLink => "create_signup_payment_link",
            ToolId::SendSmsPaymentLink => "send_sms_payment_link",
            ToolId::UploadPhotoToS3 => "upload_photo_to_s3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "person_name_validation" => ToolId::PersonNameValidation,
            "child_dob_validation" => ToolId::ChildDobValidation,
            "medical_issues_validation" => ToolId::MedicalIssuesValidation,
            "address_lookup" => ToolId::AddressLookup,
            "address_validation" => ToolId::AddressValidation,
            "check_if_record_exists_in_db" => ToolId::CheckIfRecordExistsInDb,
            "check_if_kit_needed" => ToolId::CheckIfKitNeeded,
            "check_shirt_number_availability" => ToolId::CheckShirtNumberAvailability,
            "update_reg_details_to_db" => ToolId::UpdateRegDetailsToDb,
            "update_kit_details_to_db" => ToolId::UpdateKitDetailsToDb,
            "update_photo_link_to_db" => ToolId::UpdatePhotoLinkToDb,
            "create_payment_token" => ToolId::CreatePaymentToken,
            "create_signup_payment_link" => ToolId::CreateSignupPaymentLink,
            "send_sms_payment_link" => ToolId::SendSmsPaymentLink,
            "upload_photo_to_s3" => ToolId::UploadPhotoToS3,
            _ => return None,
        })
    }
}

/// A tool call the model has requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// A tool definition advertised to the model as part of the tool schema list.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

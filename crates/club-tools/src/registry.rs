use std::sync::Arc;

use club_domain::tool::ToolId;
use club_photo::HeicDecoder;
use club_providers::{AddressLookupProvider, ObjectStore, PaymentProvider, RecordTable, SmsProvider};

use crate::handlers;
use crate::outcome::ToolOutcome;

/// Owns the adapters the tool handlers call through; one instance lives in
/// `AppState` for the life of the process (spec §4.2's "execution goes
/// through `club-providers` adapters").
pub struct ToolRegistry {
    pub address_lookup: Arc<dyn AddressLookupProvider>,
    pub record_table: Arc<dyn RecordTable>,
    pub payment: Arc<dyn PaymentProvider>,
    pub sms: Arc<dyn SmsProvider>,
    pub object_store: Arc<dyn ObjectStore>,
    pub heic_decoder: Arc<dyn HeicDecoder>,
}

impl ToolRegistry {
    /// Validate the argument schema against the call (unknown tool names are
    /// rejected here; per-field validation happens in each handler) and
    /// dispatch by name. Returns `(history_line, is_error)` (spec §4.2).
    pub async fn dispatch(&self, tool_name: &str, arguments: &serde_json::Value) -> (String, bool) {
        let Some(id) = ToolId::from_name(tool_name) else {
            let out = ToolOutcome::err_msg("unknown_tool", format!("no such tool: {tool_name}"));
            return (out.history_line(tool_name), true);
        };

        let out = match id {
            ToolId::PersonNameValidation => handlers::person_name_validation(arguments),
            ToolId::ChildDobValidation => handlers::child_dob_validation(arguments),
            ToolId::MedicalIssuesValidation => handlers::medical_issues_validation(arguments),
            ToolId::AddressLookup => handlers::address_lookup(self.address_lookup.as_ref(), arguments).await,
            ToolId::AddressValidation => handlers::address_validation(arguments),
            ToolId::CheckIfRecordExistsInDb => {
                handlers::check_if_record_exists_in_db(self.record_table.as_ref(), arguments).await
            }
            ToolId::CheckIfKitNeeded => handlers::check_if_kit_needed(self.record_table.as_ref(), arguments).await,
            ToolId::CheckShirtNumberAvailability => {
                handlers::check_shirt_number_availability(self.record_table.as_ref(), arguments).await
            }
            ToolId::UpdateRegDetailsToDb => handlers::update_reg_details_to_db(self.record_table.as_ref(), arguments).await,
            ToolId::UpdateKitDetailsToDb => handlers::update_kit_details_to_db(self.record_table.as_ref(), arguments).await,
            ToolId::UpdatePhotoLinkToDb => handlers::update_photo_link_to_db(self.record_table.as_ref(), arguments).await,
            ToolId::CreatePaymentToken => handlers::create_payment_token(self.payment.as_ref(), arguments).await,
            ToolId::CreateSignupPaymentLink => {
                handlers::create_signup_payment_link(self.payment.as_ref(), arguments).await
            }
            ToolId::SendSmsPaymentLink => handlers::send_sms_payment_link(self.sms.as_ref(), arguments).await,
            ToolId::UploadPhotoToS3 => {
                handlers::upload_photo_to_s3(self.object_store.as_ref(), self.heic_decoder.as_ref(), arguments).await
            }
        };

        let is_error = out.is_error;
        (out.history_line(tool_name), is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_providers::{FakeAddressLookupProvider, FakePaymentProvider, FakeSmsProvider, FakeObjectStore, InMemoryRecordTable};
    use club_photo::UnavailableHeicDecoder;

    fn fake_registry() -> ToolRegistry {
        ToolRegistry {
            address_lookup: Arc::new(FakeAddressLookupProvider),
            record_table: Arc::new(InMemoryRecordTable::new()),
            payment: Arc::new(FakePaymentProvider),
            sms: Arc::new(FakeSmsProvider),
            object_store: Arc::new(FakeObjectStore::default()),
            heic_decoder: Arc::new(UnavailableHeicDecoder),
        }
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_is_error() {
        let registry = fake_registry();
        let (line, is_error) = registry.dispatch("not_a_tool", &serde_json::json!({})).await;
        assert!(is_error);
        assert!(line.contains("err:unknown_tool"));
    }

    #[tokio::test]
    async fn dispatch_person_name_validation_ok() {
        let registry = fake_registry();
        let (line, is_error) = registry
            .dispatch("person_name_validation", &serde_json::json!({ "name": "Alice Smith" }))
            .await;
        assert!(!is_error);
        assert!(line.starts_with("tool=person_name_validation status=ok"));
    }

    #[tokio::test]
    async fn dispatch_check_shirt_number_availability() {
        let registry = fake_registry();
        let (line, is_error) = registry
            .dispatch(
                "check_shirt_number_availability",
                &serde_json::json!({ "team": "Lions", "age_group": "U10", "number": 7 }),
            )
            .await;
        assert!(!is_error);
        assert!(line.contains("\"available\":true"));
    }
}

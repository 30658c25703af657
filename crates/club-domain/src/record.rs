use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Incomplete,
    Active,
    Suspended,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KitDetails {
    pub size: Option<String>,
    pub shirt_number: Option<u8>,
    pub kit_type: Option<String>,
}

/// The registration record as owned by the external record table. The core
/// mutates it through `club_providers::RecordTable` with optimistic
/// last-writer-wins semantics; there are no in-process locks over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub billing_request_id: String,

    // Parent identity
    pub parent_full_name: String,
    pub parent_phone: Option<String>,
    pub parent_email: Option<String>,
    pub parent_dob: Option<String>,
    pub parent_address: Option<String>,
    pub parent_relationship: Option<String>,

    // Child identity
    pub player_full_name: String,
    pub player_dob: Option<String>,
    pub player_gender: Option<String>,
    pub medical_notes: Option<String>,
    pub player_address: Option<String>,

    // Team/age/season
    pub team: String,
    pub age_group: String,
    pub season: String,

    // Payment
    pub preferred_payment_day: i8,
    pub monthly_amount: f64,

    // Kit
    pub kit: KitDetails,

    // Photo
    pub photo_url: Option<String>,

    // Payment status flags
    pub signing_fee_paid: bool,
    pub mandate_authorised: bool,
    pub subscription_activated: bool,
    pub payment_id: Option<String>,
    pub mandate_id: Option<String>,

    // Subscription identifiers
    pub subscription_id: Option<String>,
    pub interim_subscription_id: Option<String>,
    pub interim_start: Option<String>,
    pub interim_end: Option<String>,

    pub sibling_discount_applied: bool,

    pub registration_status: RegistrationStatus,

    /// JSON snapshot of conversation history written at the photo-upload step.
    pub conversation_snapshot: Option<serde_json::Value>,

    /// `<month>_<year>_payment_status` fields, keyed e.g. `"september_2025"`.
    pub monthly_payment_status: std::collections::BTreeMap<String, String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationRecord {
    pub fn new(billing_request_id: impl Into<String>) -> Self {
        let now = Utc::now();
        RegistrationRecord {
            billing_request_id: billing_request_id.into(),
            parent_full_name: String::new(),
            parent_phone: None,
            parent_email: None,
            parent_dob: None,
            parent_address: None,
            parent_relationship: None,
            player_full_name: String::new(),
            player_dob: None,
            player_gender: None,
            medical_notes: None,
            player_address: None,
            team: String::new(),
            age_group: String::new(),
            season: String::new(),
            preferred_payment_day: -1,
            monthly_amount: 0.0,
            kit: KitDetails::default(),
            photo_url: None,
            signing_fee_paid: false,
            mandate_authorised: false,
            subscription_activated: false,
            payment_id: None,
            mandate_id: None,
            subscription_id: None,
            interim_subscription_id: None,
            interim_start: None,
            interim_end: None,
            sibling_discount_applied: false,
            registration_status: RegistrationStatus::Pending,
            conversation_snapshot: None,
            monthly_payment_status: std::collections::BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The surname used for sibling-discount matching: the last
    /// whitespace-delimited token of the child's full name.
    pub fn player_last_name(&self) -> &str {
        self.player_full_name
            .rsplit_whitespace()
            .next()
            .unwrap_or(&self.player_full_name)
    }
}

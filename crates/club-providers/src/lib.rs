pub mod address;
pub mod health;
pub mod model;
pub mod object_store;
pub mod payment;
pub mod record_table;
pub mod retry;
pub mod sms;

pub use address::{AddressLookupProvider, FakeAddressLookupProvider, HttpAddressLookupProvider};
pub use health::HealthStatus;
pub use model::{FakeModelProvider, HttpModelProvider, ModelProvider, ModelReply, ModelRequest};
pub use object_store::{FakeObjectStore, HttpObjectStore, ObjectStore};
pub use payment::{BillingRequest, FakePaymentProvider, HttpPaymentProvider, PaymentProvider, SubscriptionIds};
pub use record_table::{ExistingRecordLookup, HttpRecordTable, InMemoryRecordTable, RecordTable, ShirtNumberAvailability};
pub use retry::with_backoff;
pub use sms::{FakeSmsProvider, HttpSmsProvider, SmsProvider};

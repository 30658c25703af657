pub mod envelope;
pub mod process;

pub use envelope::{validate_envelope, EnvelopeError, MAX_EVENTS_PER_ENVELOPE};
pub use process::{process_envelope, process_event};

//! Core domain types for Switchboard.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: field identifiers,
//! field values and their canonical snapshots, validation verdicts, and the small
//! synchronization-domain types shared between the engine and the wire.

mod ids;
mod snapshot;
mod status;
mod validate;
mod value;

pub use ids::{FieldId, FormId};
pub use snapshot::FormSnapshot;
pub use status::{LastKnownStatus, RecipientMode};
pub use validate::{
    FieldValidationResult, validate_access_token, validate_message_template, validate_service_url,
    validate_whatsapp_number,
};
pub use value::FieldValue;

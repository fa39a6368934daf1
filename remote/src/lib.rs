//! Client for the remote ticket record API.
//!
//! # Architecture
//!
//! - [`RecordClient`] - authenticated HTTP access to tickets and ticket field definitions
//! - [`FieldMapping`] - locates the score-related custom fields among the field definitions
//! - [`RemoteError`] / [`ApiError`] - failures, inspectable through
//!   [`safewrite_types::WriteFailure`] so writes can be retried by status
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | [`RecordClient::fetch_ticket`] | `GET /api/v2/tickets/{id}.json` |
//! | [`RecordClient::update_custom_field`] | `PUT /api/v2/tickets/{id}.json` |
//! | [`RecordClient::list_ticket_fields`] | `GET /api/v2/ticket_fields.json?per_page=100`, paginated |

mod client;
mod error;
mod fields;
mod model;

pub use client::{Credentials, RecordClient};
pub use error::{ApiError, RemoteError};
pub use fields::FieldMapping;
pub use model::{CustomFieldValue, Ticket, TicketField};

pub use safewrite_types;

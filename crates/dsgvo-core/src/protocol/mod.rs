//! Compliance protocols: the ordered categories and criteria a document is
//! checked against.
//!
//! Protocols are structured data validated against JSON Schema.
//! This module handles parsing YAML/JSON protocols, the legacy flat JSON map
//! format, and the built-in GDPR protocol.

mod defaults;
mod parser;
mod schema;

pub use parser::{Category, Protocol, ProtocolError};
pub use schema::validate_protocol_schema;

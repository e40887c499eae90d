//! Database layer for chatlens
//!
//! This module provides read-only access to the message archive:
//! - Opening with existence and schema checks
//! - The grouped count queries and the message-body query
//! - Per-row decode failures counted and skipped, never fatal

pub mod archive;
pub mod queries;

pub use archive::{Archive, MessageBodyRow, QueryOutput, RawCountRow};

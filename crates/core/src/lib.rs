//! Duct Order Core - Shared types library.
//!
//! This crate provides common types used across all Duct Order components:
//! - `server` - JSON API, sessions and static hosting for the order form
//! - `cli` - Command-line tools for migrations, user roles and backups
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, phone numbers and roles
//! - [`catalog`] - The duct parts catalog, order validation and order sheets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use catalog::{
    Checkbox, Customer, Direction, Measurement, OrderError, OrderItem, OrderSheet,
    PartDefinition, SheetItem, SheetLine, SheetOption, catalog, find_part, validate_order,
};
pub use types::*;

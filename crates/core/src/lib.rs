//! Emporium Core - Shared types library.
//!
//! This crate provides common types used across all Emporium components:
//! - `storefront` - Public customer API (catalog, OTP login, checkout)
//! - `admin` - Administration API (catalog and order management)
//! - `cli` - Command-line tools for admin users and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, phones, money, and statuses
//! - [`otp`] - One-time password generation and verification rules
//! - [`token`] - Bearer token claims and HS256 signing
//! - [`slug`] - URL slug generation
//! - [`pagination`] - Page query parameters and paginated responses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod otp;
pub mod pagination;
pub mod slug;
pub mod token;
pub mod types;

pub use types::*;

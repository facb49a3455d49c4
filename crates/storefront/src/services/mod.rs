//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Customer OTP login
//! - `checkout` - Order pricing and payment finalization
//! - `email` - Transactional email over SMTP
//! - `razorpay` - Payment gateway client and signature checks

pub mod auth;
pub mod checkout;
pub mod email;
pub mod razorpay;

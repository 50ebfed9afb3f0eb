//! One-time confirmation codes for the two signup flows.
//!
//! Customers receive a short numeric code over SMS; experts receive a UUID
//! token embedded in an email confirmation link. Both are single-use: the
//! database clears them on successful confirmation.

use rand::Rng;
use uuid::Uuid;

/// Number of digits in an SMS login code.
pub const SMS_CODE_LEN: usize = 4;

/// Generate a random numeric SMS code, zero-padded to [`SMS_CODE_LEN`] digits.
pub fn generate_sms_code() -> String {
    let n: u32 = rand::rng().random_range(0..10_000);
    format!("{n:0>width$}", width = SMS_CODE_LEN)
}

/// Generate an opaque email confirmation token.
pub fn generate_email_code() -> String {
    Uuid::new_v4().to_string()
}

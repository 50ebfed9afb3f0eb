//! Fire-and-forget outbound notifications: SMS login codes and expert
//! verification emails.
//!
//! Senders in this crate never participate in request correctness: callers
//! dispatch them on a spawned task after the response is prepared and log
//! failures instead of propagating them.

pub mod mail;
pub mod sms;

pub use mail::{MailConfig, MailError, MailSender};
pub use sms::{SmsConfig, SmsError, SmsSender};

//! Core SMTP types.

mod address;
mod extension;
mod reply;

pub use address::Address;
pub use extension::{AuthMechanism, Extension, ExtensionSet};
pub use reply::{EnhancedCode, LineInfo, Reply, ReplyCode};

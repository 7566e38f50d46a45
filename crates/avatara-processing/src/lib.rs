//! Avatara Processing Library
//!
//! Image validation and tiered variant generation for the avatar pipeline.
//! All work in this crate is pure CPU: no network, no disk.

pub mod validator;
pub mod variants;

pub use validator::AvatarValidator;
pub use variants::{VariantBlob, VariantGenerator};

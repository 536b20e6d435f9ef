//! Signing backend integration.
//!
//! The backend owns PDF storage and signature compositing. The desk only
//! uploads originals, asks for a signature to be applied, and hands out
//! download URLs for the result.

mod client;
mod error;
mod wire;

pub use client::{SigningBackendClient, UploadedDocument};
pub use error::BackendError;
pub use wire::{SignRequest, SignResponse};

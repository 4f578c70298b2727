//! Custom extractors for Axum handlers.
//!
//! Rejections are rendered through [`crate::AppError`] so clients always
//! receive a `{ "message": ... }` body.

pub mod json_body;

pub use json_body::JsonBody;

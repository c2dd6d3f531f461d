//! External service integrations.

pub mod qr;

pub use qr::{extract_code, HttpQrRenderer, MockQrRenderer, QrError, QrLinks, QrRenderer};

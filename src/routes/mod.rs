//! Route modules for OCR Forge

pub mod auth;
pub mod billing;
pub mod convert;
pub mod downloads;
pub mod health;

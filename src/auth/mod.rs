//! Authentication module
//!
//! Password hashing, the login session, flash messages, and the
//! `CurrentAccount` extractor that gates protected routes.

mod password;
mod session;

pub use password::{hash_password, verify_password, PasswordError};
pub use session::{
    flash, take_flashes, CurrentAccount, Flash, FlashLevel, ACCOUNT_ID_KEY,
};

//! OAuth 2.0 client-credentials tokens and the token sources that cache and renew them.

pub mod source;
pub mod token;

pub use source::*;
pub use token::*;

//! Body decoding: upstream responses (success/error disambiguation) and inbound requests
//! (client-facing rejections), both followed by field validation.

pub mod request;
pub mod response;
pub mod validate;

pub use request::*;
pub use response::*;
pub use validate::*;

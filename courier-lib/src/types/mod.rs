#![allow(unreachable_pub)]

mod error;
mod host_key;
mod request;
mod response;
mod timeouts;

pub use error::ErrorKind;
pub use host_key::HostKey;
pub use request::Request;
pub use response::{Response, ResponseSource};
pub use timeouts::Timeouts;

/// The courier `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;

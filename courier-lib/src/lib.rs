//! `courier` schedules outbound HTTP calls and runs each of them through an
//! interceptor chain.
//!
//! A [`Client`] creates single-use [`Call`]s. A call either runs on the
//! caller's task with [`Call::execute`], or is handed to the client's
//! [`Dispatcher`] with [`Call::enqueue`], which starts it as soon as the
//! global and per-host concurrency limits allow.
//!
//! ```no_run
//! use courier_lib::{ClientBuilder, Request, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::default().client()?;
//!   let call = client.new_call(Request::get("https://example.com")?);
//!   let response = call.execute().await?;
//!   println!("{response}");
//!   Ok(())
//! }
//! ```
//!
//! Enqueued calls report back through a [`Callback`], or through a future:
//!
//! ```no_run
//! use courier_lib::{ClientBuilder, Request, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::default().client()?;
//!   let pending: Vec<_> = ["https://example.com/a", "https://example.com/b"]
//!       .into_iter()
//!       .map(|url| client.new_call(Request::get(url)?).enqueue_future())
//!       .collect::<Result<_>>()?;
//!   for response in pending {
//!       println!("{}", response.await?);
//!   }
//!   Ok(())
//! }
//! ```

mod call;
mod client;
mod dispatcher;
mod retry;
mod types;

pub mod cache;
pub mod chain;
pub mod config;
pub mod event;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::{
    call::{Call, CallId, Callback, PendingResponse},
    client::{
        Client, ClientBuilder, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT_TIME, DEFAULT_USER_AGENT,
    },
    dispatcher::{Dispatcher, DispatcherConfig, IdleCallback},
    types::{ErrorKind, HostKey, Request, Response, ResponseSource, Result, Timeouts},
};

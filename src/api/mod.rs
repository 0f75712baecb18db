//! Request construction, resilient execution and response classification.
//!
//! # Example
//!
//! ```no_run
//! use inquestlabs_core::api::{Executor, operations};
//! use inquestlabs_core::config::ClientConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = Executor::from_config(&ClientConfig::default(), None)?;
//! let payload = executor.execute(&operations::dfi_list(), false).await?;
//! println!("{:?}", payload.into_json());
//! # Ok(())
//! # }
//! ```

mod executor;
pub mod operations;
mod request;
mod retry;
mod transport;

pub use executor::{ApiPayload, Executor, authorization_value, classify, user_agent};
pub use request::{FileAttachment, FormValue, Method, RequestSpec};
pub use retry::{BackoffPolicy, RetryDecision};
pub use transport::{
    FilePart, OutboundBody, OutboundRequest, ReqwestTransport, Transport, TransportError,
    TransportResponse,
};

//! REST client for the application portal backend.
//!
//! `ApiClient` owns the token lifecycle on the wire: bearer attachment,
//! refresh of expired tokens, and one refresh-and-retry on 401. The
//! session it works against is injected at construction.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, ApiRequest, RegisterOutcome, RequestBody, UploadPart};
pub use error::{ApiError, Disposition};

//! # Types Module
//!
//! Provider-agnostic data types shared by adapters and the orchestrator.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and text content |
//! | [`MessageRole`] | Message role (system, user) |
//! | [`CanonicalRequest`] | One prompt plus generation parameters, shared by every provider call of a round |
//!
//! ## Example
//!
//! ```rust
//! use prompt_arena::types::CanonicalRequest;
//!
//! let request = CanonicalRequest::new("Explain borrowing in one sentence")
//!     .with_system_prompt("You are terse.")
//!     .with_temperature(0.2)
//!     .with_max_tokens(200);
//!
//! let messages = request.messages();
//! assert_eq!(messages.len(), 2);
//! ```

pub mod message;
pub mod request;

pub use message::{Message, MessageRole};
pub use request::CanonicalRequest;

//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! for easy glob importing:
//!
//! ```ignore
//! use swaddle_core::prelude::*;
//! ```

pub use crate::{Error, Method, Request, RequestBuilder, Response, Result, Transport};

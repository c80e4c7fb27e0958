//! Dualstore Documents
//!
//! Generic nested documents as they flow between the legacy and the target
//! document store, plus the key normalization that makes them safe to write
//! into the target store.
//!
//! # Core Concepts
//!
//! - [`Value`]: Closed variant over null, bool, number, string, document, list
//! - [`Document`]: String-keyed mapping of [`Value`]s
//! - [`normalize_key`]: Canonical, storage-safe field name
//! - [`transform`]: Structural recursion applying [`normalize_key`] to every key
//!
//! # Example
//!
//! ```rust
//! use dualstore_document::{transform, Document, Value};
//!
//! let doc: Document = [
//!     ("Flight Name".to_string(), Value::from("AB123")),
//!     ("Source Airport".to_string(), Value::from("SFO")),
//! ]
//! .into_iter()
//! .collect();
//!
//! let normalized = transform(&doc);
//! assert_eq!(normalized.get("flight_name"), Some(&Value::from("AB123")));
//! assert_eq!(normalized.get("source_airport"), Some(&Value::from("SFO")));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod normalize;
mod transform;
mod value;

// Re-exports
pub use normalize::normalize_key;
pub use transform::{transform, transform_value};
pub use value::{Document, Number, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

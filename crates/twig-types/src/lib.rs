//! Foundation types for Twig.
//!
//! This crate provides the identifier and identity types shared by every
//! other Twig crate.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash) for blobs,
//!   trees and commits
//! - [`Identity`] -- Author/committer signature: name, email and timestamp

pub mod error;
pub mod identity;
pub mod object;

pub use error::TypeError;
pub use identity::Identity;
pub use object::ObjectId;

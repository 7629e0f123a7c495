//! Content hashing for Twig.
//!
//! Provides domain-separated BLAKE3 hashing so that a blob, a tree and a
//! commit with byte-identical payloads never share an [`ObjectId`].
//!
//! [`ObjectId`]: twig_types::ObjectId

pub mod hasher;

pub use hasher::ContentHasher;

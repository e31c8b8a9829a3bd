//! Logical schema registry.
//!
//! The registry maps logical schema names to their descriptors. It is shared
//! by every connection and replaced wholesale on configuration reload:
//! readers always see one complete snapshot, never a half-applied update.
//!
//! The engine depends on the [`SchemaResolver`] trait rather than the
//! concrete [`SchemaRegistry`], so tests can substitute a fixed resolver.

mod registry;

pub use registry::{SchemaDescriptor, SchemaRegistry, SchemaResolver, SchemaSnapshot};

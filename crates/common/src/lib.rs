//! Common resource types shared across the client monitor crates.

#![warn(clippy::pedantic)]

/// Module for object identifiers and metadata
pub mod types;

/// Module for resource type descriptors (kind, api version, representation)
pub mod resource;

/// Module for metric assertions over a debugging recorder
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use resource::{
    DynamicObject, GroupVersion, Object, ObjectList, Resource, TypeDescriptor, TypedResource,
    UNKNOWN,
};
pub use types::{ObjectKey, ObjectMeta, TypeMeta};

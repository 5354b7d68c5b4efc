//! Runtime value and object model.
//!
//! Values, interned property keys, objects with their property storage and
//! prototype caches, and the realm that owns the intrinsic objects.

pub mod enumerator;
pub mod error;
pub mod function_object;
pub mod generator;
pub mod object;
pub mod object_property;
pub mod operations;
pub mod promise;
pub mod property_key;
pub mod prototype_cache;
pub mod realm;
pub mod symbol;
pub mod value;

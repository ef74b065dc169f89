//! Reply-generation capability: the trait, a type-erased wrapper, and an
//! offline echo implementation.

pub mod box_generator;
pub mod echo;
pub mod generator;

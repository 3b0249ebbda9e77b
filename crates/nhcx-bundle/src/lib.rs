//! Document-profile bundle assembly.
//!
//! Turns one coded document or a fused record into an ordered,
//! referentially-closed resource graph: Composition first, every clinical
//! resource linked to the patient and referenced from a Composition
//! section. Purely constructs the in-memory graph; no I/O.

mod builder;

pub use builder::{BundleBuilder, BundleOptions, SourceAttachment};

pub mod attestation;
pub mod classify;
pub mod store;
pub mod tracker;

pub use attestation::*;
pub use classify::*;
pub use store::*;
pub use tracker::*;

pub mod error;
pub mod record;
pub mod signer;
pub mod stats;
pub mod task;
pub mod value;

pub use error::*;
pub use record::*;
pub use signer::*;
pub use stats::*;
pub use task::*;
pub use value::*;

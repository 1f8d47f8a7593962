pub mod block;
pub mod miner;
pub mod mining_loop;
pub mod seal;
pub mod store;
pub mod traits;

#[cfg(feature = "memory-store")]
pub mod memory;

pub use block::*;
pub use miner::*;
pub use mining_loop::*;
pub use seal::*;
pub use store::*;
pub use traits::*;

#[cfg(feature = "memory-store")]
pub use memory::*;

//! Agora Types - value types shared by the governance engine and the node.
//!
//! - Addresses (20-byte, Bech32m encoded with the `agora` prefix)
//! - Hashes (32-byte blake3 digests, plus a domain-separated builder)
//! - Amounts (u128 token quantities with checked arithmetic)

pub mod address;
pub mod amount;
pub mod error;
pub mod hash;

#[cfg(any(feature = "serde", feature = "borsh"))]
mod serialization;

pub use address::Address;
pub use amount::Amount;
pub use error::TypesError;
pub use hash::{Hash, HashBuilder};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Amount, Hash, HashBuilder, TypesError};
}

// Shared primitives: value types, errors and signature verification
pub mod primitives;
pub mod error;
pub mod crypto;

pub use primitives::*;
pub use error::*;
pub use crypto::*;

//! Transaction Module
//!
//! Resolves chain state for unsigned transactions and defines the codec
//! boundary used to encode them and check what the wallet signed.

mod builder;
mod codec;

pub use builder::*;
pub use codec::*;

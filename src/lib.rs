#![deny(missing_debug_implementations)]

pub mod client;
pub mod decode;
pub mod encode;
pub mod grammar;
pub mod hash;
pub mod stream;

#[cfg(test)]
mod testing;

pub use adc_types;
pub use adc_types as types;
pub use decode::{Decoder, MessageCodec, MessageDecodeError};
pub use encode::Encode;

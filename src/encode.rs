//! # Encoding of messages.
//!
//! All message types implement the [`Encode`] trait and serialize into any
//! `io::Write`. Text parameters are escaped on the way out; a [`Message`]
//! writes the terminating `0x0a` itself.

use std::io::Write;

use adc_types::{
    message::{Header, Message, Param},
    utils::escape_param,
};

/// Serialization into the ADC wire format.
pub trait Encode {
    /// Writes the wire form of `self` into `writer`.
    fn encode(&self, writer: &mut impl Write) -> std::io::Result<()>;

    /// Convenience dump into a fresh buffer.
    fn to_wire(&self) -> Vec<u8> {
        let mut buffer = Vec::new();

        // # Safety
        //
        // `unwrap` can't panic because writing into a `Vec` is infallible.
        self.encode(&mut buffer).unwrap();

        buffer
    }
}

impl Encode for Header {
    fn encode(&self, writer: &mut impl Write) -> std::io::Result<()> {
        write!(writer, "{self}")
    }
}

impl Encode for Param {
    fn encode(&self, writer: &mut impl Write) -> std::io::Result<()> {
        match self {
            Param::Positional(value) => writer.write_all(escape_param(value).as_bytes()),
            Param::Named(key, value) => {
                writer.write_all(key.as_str().as_bytes())?;
                writer.write_all(escape_param(value).as_bytes())
            }
        }
    }
}

impl Encode for Message {
    fn encode(&self, writer: &mut impl Write) -> std::io::Result<()> {
        if let Some(header) = self.header() {
            header.encode(writer)?;

            for param in self.params() {
                writer.write_all(b" ")?;
                param.encode(writer)?;
            }
        }

        writer.write_all(b"\n")
    }
}

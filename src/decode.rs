//! # Decoding of messages.
//!
//! [`MessageCodec`] turns a `0x0a`-terminated line into a
//! [`Message`](adc_types::message::Message). Decoding either consumes a whole
//! line or fails: a stream that desynchronizes mid-line cannot be recovered,
//! so callers are expected to drop the transport on [`MessageDecodeError::Failed`].

use adc_types::message::Message;

use crate::grammar;

/// Decoder.
///
/// Implemented for types that know how to decode a specific ADC message.
pub trait Decoder {
    type Message;
    type Error;

    /// Decodes one message from the front of `input`, returning the
    /// remainder.
    fn decode<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], Self::Message), Self::Error>;
}

/// Decoder for a single protocol message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MessageCodec;

impl Decoder for MessageCodec {
    type Message = Message;
    type Error = MessageDecodeError;

    fn decode<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], Message), MessageDecodeError> {
        let position = input
            .iter()
            .position(|byte| *byte == b'\n')
            .ok_or(MessageDecodeError::Incomplete)?;

        let line = &input[..position];
        let remaining = &input[position + 1..];

        match grammar::message(line) {
            Ok((_, message)) => Ok((remaining, message)),
            Err(_) => Err(MessageDecodeError::Failed),
        }
    }
}

/// Error during message decoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageDecodeError {
    /// More data is needed: no line terminator was seen yet.
    Incomplete,

    /// Decoding failed; the line violates the grammar.
    Failed,
}

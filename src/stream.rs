//! Frame-level integration with `tokio_util::codec`.
//!
//! [`AdcCodec`] splits a byte stream on `0x0a`, enforces a line-length
//! limit, and hands complete lines to the message parser. A malformed line
//! is unrecoverable (there is no way to resynchronize the stream), so both
//! error variants are meant to end the connection.

use std::io::Error as IoError;

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder as TokioDecoder, Encoder as TokioEncoder};

use adc_types::message::Message;

use crate::{
    decode::{Decoder, MessageCodec, MessageDecodeError},
    encode::Encode,
};

/// The default cap on a single line. ADC does not mandate one; this keeps a
/// misbehaving hub from growing the read buffer without bound.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 65536;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AdcCodec {
    max_line_length: usize,
}

impl AdcCodec {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }
}

impl Default for AdcCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

#[derive(Debug, Error)]
pub enum AdcCodecError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("Line of {length} bytes exceeds the {limit} byte limit")]
    LineTooLong { length: usize, limit: usize },
    #[error("Malformed frame")]
    MalformedFrame(BytesMut),
}

impl PartialEq for AdcCodecError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Io(error1), Self::Io(error2)) => error1.kind() == error2.kind(),
            (
                Self::LineTooLong { length, limit },
                Self::LineTooLong {
                    length: length2,
                    limit: limit2,
                },
            ) => length == length2 && limit == limit2,
            (Self::MalformedFrame(x), Self::MalformedFrame(y)) => x == y,
            _ => false,
        }
    }
}

impl TokioDecoder for AdcCodec {
    type Item = Message;
    type Error = AdcCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match MessageCodec.decode(src) {
            Ok((remaining, message)) => {
                let consumed = src.len() - remaining.len();
                src.advance(consumed);

                Ok(Some(message))
            }
            Err(MessageDecodeError::Incomplete) => {
                if src.len() > self.max_line_length {
                    return Err(AdcCodecError::LineTooLong {
                        length: src.len(),
                        limit: self.max_line_length,
                    });
                }

                Ok(None)
            }
            Err(MessageDecodeError::Failed) => {
                // # Safety
                //
                // `unwrap` can't panic: `Failed` implies a terminator was
                // found.
                let eol = src.iter().position(|byte| *byte == b'\n').unwrap();
                let discarded = src.split_to(eol + 1);

                Err(AdcCodecError::MalformedFrame(discarded))
            }
        }
    }
}

impl TokioEncoder<&Message> for AdcCodec {
    type Error = AdcCodecError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut writer = dst.writer();
        item.encode(&mut writer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use adc_types::message::Header;

    use super::*;

    #[test]
    fn test_decoder_assembles_lines() {
        let tests: &[(&[u8], Result<Option<Message>, AdcCodecError>)] = &[
            (b"", Ok(None)),
            (b"ISID ", Ok(None)),
            (b"AAAB", Ok(None)),
            (
                b"\n",
                Ok(Some(
                    Message::new(Header::info("SID").unwrap()).with_param("AAAB"),
                )),
            ),
            (b"\n", Ok(Some(Message::keep_alive()))),
        ];

        let mut src = BytesMut::new();
        let mut codec = AdcCodec::default();

        for (input, expected) in tests {
            src.extend_from_slice(input);
            let got = codec.decode(&mut src);

            assert_eq!(expected, &got);
        }
    }

    #[test]
    fn test_decoder_rejects_malformed_lines() {
        let mut src = BytesMut::from(b"???\nISTA 000 ok\n".as_ref());
        let mut codec = AdcCodec::default();

        assert_eq!(
            Err(AdcCodecError::MalformedFrame(BytesMut::from(
                b"???\n".as_ref()
            ))),
            codec.decode(&mut src)
        );

        // The offending line is discarded; the next one parses.
        let next = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!("STA", next.header().unwrap().command().as_str());
    }

    #[test]
    fn test_decoder_line_limit() {
        let mut codec = AdcCodec::new(16);
        let mut src = BytesMut::from(vec![b'A'; 32].as_slice());

        assert_eq!(
            Err(AdcCodecError::LineTooLong {
                length: 32,
                limit: 16
            }),
            codec.decode(&mut src)
        );
    }

    #[test]
    fn test_encoder() {
        let mut codec = AdcCodec::default();
        let mut dst = BytesMut::new();

        let message =
            Message::new(Header::broadcast("MSG", "AAAB").unwrap()).with_param("Hello world");
        codec.encode(&message, &mut dst).unwrap();

        assert_eq!(b"BMSG AAAB Hello\\sworld\n".as_ref(), &dst[..]);
    }
}

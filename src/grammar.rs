//! Raw nom parsers for the formal syntax of ADC 1.0.
//!
//! One function per grammar production. All parsers are complete-input: the
//! caller hands over a single line with the `0x0a` terminator already
//! stripped, and [`message`] must consume it entirely.

use nom::{
    branch::alt,
    bytes::complete::{tag, take, take_while1},
    combinator::{all_consuming, map, map_res, value},
    error::{make_error, Error, ErrorKind},
    multi::{many0, many1},
    sequence::{pair, preceded, tuple},
    IResult,
};

use adc_types::{
    core::{Cid, CommandName, FeatureName, Sid},
    message::{FeatureOp, Header, HeaderKind, Message, Param},
    utils::indicators::is_base32_char,
};

/// `encoded_sid ::= base32_character{4}`
pub fn sid(input: &[u8]) -> IResult<&[u8], Sid> {
    map_res(take(4usize), Sid::try_from)(input)
}

/// `encoded_cid ::= base32_character+`
pub fn cid(input: &[u8]) -> IResult<&[u8], Cid> {
    map_res(take_while1(is_base32_char), Cid::try_from)(input)
}

/// `command_name ::= simple_alpha simple_alphanum simple_alphanum`
pub fn command_name(input: &[u8]) -> IResult<&[u8], CommandName> {
    map_res(take(3usize), CommandName::try_from)(input)
}

/// `feature_name ::= simple_alpha simple_alphanum{3}`
pub fn feature_name(input: &[u8]) -> IResult<&[u8], FeatureName> {
    map_res(take(4usize), FeatureName::try_from)(input)
}

/// `parameter_value ::= escaped_letter+`
///
/// Escape sequences are decoded while scanning; the result must be valid
/// UTF-8.
pub fn parameter_value(input: &[u8]) -> IResult<&[u8], String> {
    let mut decoded = Vec::new();
    let mut at = 0;

    loop {
        match input.get(at).copied() {
            None | Some(b' ') | Some(b'\n') => break,
            Some(b'\\') => {
                match input.get(at + 1).copied() {
                    Some(b's') => decoded.push(b' '),
                    Some(b'n') => decoded.push(b'\n'),
                    Some(b'\\') => decoded.push(b'\\'),
                    _ => {
                        return Err(nom::Err::Error(make_error(
                            &input[at..],
                            ErrorKind::Escaped,
                        )))
                    }
                }
                at += 2;
            }
            Some(byte) => {
                decoded.push(byte);
                at += 1;
            }
        }
    }

    if at == 0 {
        return Err(nom::Err::Error(make_error(input, ErrorKind::TakeWhile1)));
    }

    let decoded = String::from_utf8(decoded)
        .map_err(|_| nom::Err::Error(make_error::<_, Error<&[u8]>>(input, ErrorKind::Char)))?;

    Ok((&input[at..], decoded))
}

/// `parameter ::= parameter_name parameter_value? | parameter_value`
///
/// Tokens are classified after escape decoding; see
/// [`Param::classify`](adc_types::message::Param::classify).
pub fn parameter(input: &[u8]) -> IResult<&[u8], Param> {
    map(parameter_value, Param::classify)(input)
}

/// `b_message_header ::= 'B' command_name separator my_sid`
fn b_message_header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        tuple((tag(b"B"), command_name, tag(b" "), sid)),
        |(_, cmd, _, sid)| Header::Broadcast { cmd, sid },
    )(input)
}

/// `cih_message_header ::= ('C' | 'I' | 'H') command_name`
fn cih_message_header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        pair(
            alt((
                value(HeaderKind::Client, tag(b"C")),
                value(HeaderKind::Info, tag(b"I")),
                value(HeaderKind::Hub, tag(b"H")),
            )),
            command_name,
        ),
        |(kind, cmd)| match kind {
            HeaderKind::Client => Header::Client { cmd },
            HeaderKind::Info => Header::Info { cmd },
            _ => Header::Hub { cmd },
        },
    )(input)
}

/// `de_message_header ::= ('D' | 'E') command_name separator my_sid separator target_sid`
fn de_message_header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        tuple((
            alt((
                value(HeaderKind::Direct, tag(b"D")),
                value(HeaderKind::Echo, tag(b"E")),
            )),
            command_name,
            tag(b" "),
            sid,
            tag(b" "),
            sid,
        )),
        |(kind, cmd, _, sid, _, target)| match kind {
            HeaderKind::Direct => Header::Direct { cmd, sid, target },
            _ => Header::Echo { cmd, sid, target },
        },
    )(input)
}

/// `f_message_header ::= 'F' command_name separator my_sid (separator ('+'|'-') feature_name)+`
fn f_message_header(input: &[u8]) -> IResult<&[u8], Header> {
    let feature = preceded(
        tag(b" "),
        pair(
            alt((
                value(FeatureOp::Add, tag(b"+")),
                value(FeatureOp::Remove, tag(b"-")),
            )),
            feature_name,
        ),
    );

    map(
        tuple((tag(b"F"), command_name, tag(b" "), sid, many1(feature))),
        |(_, cmd, _, sid, features)| Header::Feature { cmd, sid, features },
    )(input)
}

/// `u_message_header ::= 'U' command_name separator my_cid`
fn u_message_header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        tuple((tag(b"U"), command_name, tag(b" "), cid)),
        |(_, cmd, _, cid)| Header::Udp { cmd, cid },
    )(input)
}

/// `message_header ::= b_ | cih_ | de_ | f_ | u_message_header`
pub fn message_header(input: &[u8]) -> IResult<&[u8], Header> {
    alt((
        b_message_header,
        cih_message_header,
        de_message_header,
        f_message_header,
        u_message_header,
    ))(input)
}

/// `message_body ::= message_header (separator parameter)*`
pub fn message_body(input: &[u8]) -> IResult<&[u8], Message> {
    map(
        pair(message_header, many0(preceded(tag(b" "), parameter))),
        |(header, params)| Message::from_parts(header, params),
    )(input)
}

/// `message ::= message_body? eol`
///
/// The terminator is stripped before this parser runs; the empty line is
/// the keep-alive message.
pub fn message(line: &[u8]) -> IResult<&[u8], Message> {
    if line.is_empty() {
        return Ok((line, Message::keep_alive()));
    }

    all_consuming(message_body)(line)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use adc_types::core::ParamKey;

    use super::*;

    fn parse(line: &[u8]) -> Message {
        let (rest, message) = message(line).unwrap();
        assert!(rest.is_empty());
        message
    }

    #[test]
    fn test_b_message() {
        let message = parse(b"BART AAAA");
        let header = message.header().unwrap();

        assert_eq!(HeaderKind::Broadcast, header.kind());
        assert_eq!("ART", header.command().as_str());
        assert_eq!("AAAA", header.sid().unwrap().as_str());
    }

    #[test]
    fn test_b_message_with_arguments() {
        let message = parse(b"BART AAAA TEfoo\\sbar\\sbaz");

        assert_eq!(
            vec!["foo bar baz"],
            message.get_named(ParamKey::from_static(b"TE"))
        );
    }

    #[test]
    fn test_cih_messages() {
        assert_eq!(HeaderKind::Client, parse(b"CINF").header().unwrap().kind());
        assert_eq!(HeaderKind::Info, parse(b"ISTA").header().unwrap().kind());
        assert_eq!(HeaderKind::Hub, parse(b"HSUP").header().unwrap().kind());
    }

    #[test]
    fn test_de_message() {
        let message = parse(b"DART AAAA BBBB");
        let header = message.header().unwrap();

        assert_eq!(HeaderKind::Direct, header.kind());
        assert_eq!("AAAA", header.sid().unwrap().as_str());
        assert_eq!("BBBB", header.target().unwrap().as_str());
    }

    #[test]
    fn test_f_message() {
        let message = parse(b"FART AAAA +T000 -T002");

        let Some(Header::Feature { features, .. }) = message.header() else {
            panic!("expected feature header");
        };

        assert_eq!(2, features.len());
        assert_eq!((FeatureOp::Add, "T000"), (features[0].0, features[0].1.as_str()));
        assert_eq!(
            (FeatureOp::Remove, "T002"),
            (features[1].0, features[1].1.as_str())
        );
    }

    #[test]
    fn test_f_message_requires_features() {
        assert!(message(b"FART AAAA").is_err());
    }

    #[test]
    fn test_u_message() {
        let message = parse(b"UART AAAA");

        let Some(Header::Udp { cid, .. }) = message.header() else {
            panic!("expected UDP header");
        };

        assert_eq!("AAAA", cid.as_str());
    }

    #[test]
    fn test_keep_alive() {
        assert_eq!(Message::keep_alive(), parse(b""));
    }

    #[test]
    fn test_escapes_in_parameters() {
        let message = parse(b"BMSG AAAB Hello\\sworld");

        assert_eq!(Some("Hello world".to_owned()), message.get_positional(0));
    }

    #[test]
    fn test_rejects_malformed_lines() {
        let tests: &[&[u8]] = &[
            b"X",
            b"XINF",
            b"BINF",
            b"BINF aaaa",
            b"BINF AAA",
            b"BINF AAAAA",
            b"ISTA  240",
            b"BMSG AAAB bad\\escape",
            b"BMSG AAAB trailing\\",
            b"binf AAAA",
        ];

        for test in tests {
            assert!(message(test).is_err(), "{:?}", String::from_utf8_lossy(test));
        }
    }
}

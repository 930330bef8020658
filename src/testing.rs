//! Shared known-answer test helpers.

use adc_types::message::Message;

use crate::{
    decode::{Decoder, MessageCodec},
    encode::Encode,
};

pub(crate) fn known_answer_test_encode((test_object, expected_bytes): (impl Encode, &[u8])) {
    let got_bytes = test_object.to_wire();

    assert_eq!(
        String::from_utf8_lossy(expected_bytes),
        String::from_utf8_lossy(&got_bytes),
    );
}

/// Decodes each input, compares against the expectation, re-encodes and
/// decodes again: the wire form must round-trip to an equal message.
pub(crate) fn kat_inverse_message(tests: &[(&[u8], &[u8], Message)]) {
    for (no, (test_input, expected_remainder, expected_object)) in tests.iter().enumerate() {
        println!("# {no}");

        let (got_remainder, got_object) = MessageCodec
            .decode(test_input)
            .expect("first parsing failed");
        assert_eq!(*expected_object, got_object);
        assert_eq!(*expected_remainder, got_remainder);

        let got_output = got_object.to_wire();

        let (got_remainder, got_object_again) = MessageCodec
            .decode(&got_output)
            .expect("second parsing failed");
        assert_eq!(got_object, got_object_again);
        assert!(got_remainder.is_empty());
    }
}

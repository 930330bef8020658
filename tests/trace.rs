//! Replays a full login session against the connection state machine.
//!
//! `S:` lines are fed to the machine, `C:` lines are matched against what
//! it queues for sending. Parameters whose value is freshly generated per
//! connection (`ID`, `PD`) are matched by key only.

use adc_codec::{
    client::{Event, HubConnection, Profile},
    decode::{Decoder, MessageCodec},
    types::{core::ParamKey, message::Param, state::State},
};

enum Who {
    Client,
    Server,
}

fn split_trace(trace: &str) -> impl Iterator<Item = (Who, &str)> {
    trace.lines().map(|line| {
        if let Some(rest) = line.strip_prefix("C: ") {
            (Who::Client, rest)
        } else if let Some(rest) = line.strip_prefix("S: ") {
            (Who::Server, rest)
        } else {
            panic!("Line must begin with \"C: \" or \"S: \".");
        }
    })
}

/// Compares an expected line against a sent message, treating a bare key
/// (e.g. `ID`) in the expectation as "any value under this key".
fn matches_line(expected: &str, got: &str) {
    let decode = |line: &str| {
        let wire = format!("{line}\n");
        let (rest, message) = MessageCodec.decode(wire.as_bytes()).unwrap();
        assert!(rest.is_empty());
        message
    };

    let expected = decode(expected);
    let got = decode(got);

    assert_eq!(expected.header(), got.header());
    assert_eq!(expected.params().len(), got.params().len());

    for (expected, got) in expected.params().iter().zip(got.params()) {
        match (expected, got) {
            (Param::Named(key, value), Param::Named(got_key, _)) if value.is_empty() => {
                assert_eq!(key, got_key);
            }
            (expected, got) => assert_eq!(expected, got),
        }
    }
}

fn run_trace(connection: &mut HubConnection, trace: &str) -> Vec<Event> {
    let mut events = Vec::new();

    for (who, line) in split_trace(trace) {
        match who {
            Who::Server => {
                let wire = format!("{line}\n");
                let (rest, message) = MessageCodec.decode(wire.as_bytes()).unwrap();
                assert!(rest.is_empty());

                connection.on_frame(&message);
                events.extend(std::iter::from_fn(|| connection.poll_event()));
            }
            Who::Client => {
                let sent = connection
                    .poll_message()
                    .unwrap_or_else(|| panic!("expected client to send {line:?}"));

                matches_line(line, &sent.to_string());
            }
        }
    }

    events
}

#[test]
fn test_login_and_roster_session() {
    let mut connection = HubConnection::new(Profile {
        nick: "udoprog".into(),
        share_size: 1024 * 1024,
    });
    connection.start();

    let trace = "C: HSUP ADTIGR ADBASE
S: ISUP ADBASE ADTIGR
S: ISID AAAB
S: IINF CT32 VEMyHub/1.0 NIExample DEWelcome
C: BINF AAAB NIudoprog SS1048576 ID PD
S: BINF AABB NIalice SS1024 I410.0.0.1 SL2
S: BMSG AABB Hello\\sworld
S: IQUI AABB
";

    let events = run_trace(&mut connection, trace);

    assert_eq!(State::Normal, connection.state());
    assert!(!connection.is_closed());

    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            Event::ConnectionMade => "made",
            Event::HubIdentified { .. } => "hub",
            Event::UserInfo { .. } => "user",
            Event::Message { .. } => "message",
            Event::UserQuit { .. } => "quit",
            other => panic!("unexpected event {other:?}"),
        })
        .collect();

    assert_eq!(vec!["made", "hub", "user", "message", "quit"], kinds);

    let Some(Event::Message { text, .. }) = events
        .iter()
        .find(|event| matches!(event, Event::Message { .. }))
    else {
        panic!("expected a chat event");
    };
    assert_eq!("Hello world", text);
}

#[test]
fn test_fatal_status_session() {
    let mut connection = HubConnection::new(Profile {
        nick: "udoprog".into(),
        share_size: 0,
    });
    connection.start();

    let trace = "C: HSUP ADTIGR ADBASE
S: ISUP ADBASE ADTIGR
S: ISID AAAB
S: IINF NIExample
C: BINF AAAB NIudoprog SS0 ID PD
S: ISTA 240 Protocol\\serror
";

    let events = run_trace(&mut connection, trace);

    assert!(connection.is_closed());
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::Status { status } if status.is_fatal())));
}

#[test]
fn test_hub_identified_carries_dirty_snapshot() {
    let mut connection = HubConnection::new(Profile {
        nick: "udoprog".into(),
        share_size: 0,
    });
    connection.start();

    let trace = "C: HSUP ADTIGR ADBASE
S: ISUP ADBASE ADTIGR
S: ISID AAAB
S: IINF NIExample VEMyHub/1.0
";

    let events = run_trace(&mut connection, trace);

    let Some(Event::HubIdentified { info }) = events
        .iter()
        .find(|event| matches!(event, Event::HubIdentified { .. }))
    else {
        panic!("expected hub identification");
    };

    // The snapshot shows what changed; the live record has been cleaned.
    assert!(info.is_dirty(ParamKey::from_static(b"NI")));
    assert!(!connection.hub_info().is_dirty(ParamKey::from_static(b"NI")));
    assert_eq!(Some("Example"), connection.hub_info().nick());
}

use std::num::NonZeroU32;

use crate::error::Result;
use crate::proto::{Endianness, Flags};
use crate::{frame_length, parse, render, Marshaller, Message, MessageKind, Signature, Value};

#[rustfmt::skip]
const LE_BLOB: [u8; 36] = [
    // byte 0
    // yyyyuu fixed headers
    b'l',
    // reply (which is the simplest message)
    b'\x02',
    // no auto-starting
    b'\x02',
    // D-Bus version = 1
    b'\x01',
    // byte 4
    // bytes in body = 4
    b'\x04', b'\x00', b'\x00', b'\x00',
    // byte 8
    // serial number = 0x12345678
    b'\x78', b'\x56', b'\x34', b'\x12',
    // byte 12
    // a(yv) variable headers start here
    // bytes in array of variable headers = 15
    // pad to 8-byte boundary = nothing
    b'\x0f', b'\0', b'\0', b'\0',
    // byte 16
    // in reply to:
    b'\x05',
    // variant signature = u
    // pad to 4-byte boundary = nothing
    b'\x01', b'u', b'\0',
    // 0xabcdef12
    // pad to 8-byte boundary = nothing
    b'\x12', b'\xef', b'\xcd', b'\xab',
    // byte 24
    // signature:
    b'\x08',
    // variant signature = g
    b'\x01', b'g', b'\0',
    // 1 byte, u, NUL (no alignment needed)
    b'\x01', b'u', b'\0',
    // pad to 8-byte boundary for body
    b'\0',
    // body; byte 32
    // 0xdeadbeef
    b'\xef', b'\xbe', b'\xad', b'\xde'
];

#[rustfmt::skip]
const BE_BLOB: [u8; 36] = [
    b'B', b'\x02', b'\x02', b'\x01',
    b'\x00', b'\x00', b'\x00', b'\x04',
    b'\x12', b'\x34', b'\x56', b'\x78',
    b'\0', b'\0', b'\0', b'\x0f',
    b'\x05', b'\x01', b'u', b'\0',
    b'\xab', b'\xcd', b'\xef', b'\x12',
    b'\x08', b'\x01', b'g', b'\0',
    b'\x01', b'u', b'\0', b'\0',
    b'\xde', b'\xad', b'\xbe', b'\xef',
];

fn serial(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero serial")
}

fn blob_message(endianness: Endianness) -> Result<Message> {
    let call = Message::method_call("/", "Call", serial(0xabcdef12));

    Ok(call
        .method_return(serial(0x12345678))
        .with_flags(Flags::NO_AUTO_START)
        .with_endianness(endianness)
        .with_body(Signature::new("u")?, vec![Value::from(0xdeadbeefu32)]))
}

#[test]
fn render_blobs() -> Result<()> {
    assert_eq!(render(&blob_message(Endianness::LITTLE)?)?, &LE_BLOB[..]);
    assert_eq!(render(&blob_message(Endianness::BIG)?)?, &BE_BLOB[..]);
    Ok(())
}

#[test]
fn parse_blobs() -> Result<()> {
    for (blob, endianness) in [
        (&LE_BLOB, Endianness::LITTLE),
        (&BE_BLOB, Endianness::BIG),
    ] {
        assert_eq!(frame_length(blob)?, Some(blob.len()));

        let mut buf = Marshaller::from_bytes(Endianness::NATIVE, blob);
        let message = parse(&mut buf)?.expect("complete message");

        assert_eq!(message, blob_message(endianness)?);
        assert_eq!(message.kind().reply_serial(), Some(serial(0xabcdef12)));
        assert_eq!(buf.remaining(), 0);
    }

    Ok(())
}

fn notify_call() -> Result<Message> {
    Ok(
        Message::method_call("/org/freedesktop/Notifications", "Notify", serial(7))
            .with_interface("org.freedesktop.Notifications")
            .with_destination("org.freedesktop.Notifications")
            .with_body(
                Signature::new("susssasa{ss}i")?,
                vec![
                    Value::from("app"),
                    Value::from(0u32),
                    Value::from(""),
                    Value::from("summary"),
                    Value::from("body"),
                    Value::Array(Vec::new()),
                    Value::empty_dict(),
                    Value::from(-1i32),
                ],
            ),
    )
}

#[test]
fn notify_round_trip() -> Result<()> {
    let call = notify_call()?;
    let bytes = render(&call)?;

    let mut buf = Marshaller::from_bytes(Endianness::NATIVE, &bytes);
    let parsed = parse(&mut buf)?.expect("complete message");

    assert_eq!(parsed.member(), Some("Notify"));
    assert_eq!(parsed.path(), Some("/org/freedesktop/Notifications"));
    assert_eq!(parsed.interface(), Some("org.freedesktop.Notifications"));
    assert_eq!(parsed.body(), call.body());
    assert_eq!(parsed, call);
    Ok(())
}

#[test]
fn every_split_is_incomplete_then_identical() -> Result<()> {
    let bytes = render(&notify_call()?)?;

    let mut whole = Marshaller::from_bytes(Endianness::NATIVE, &bytes);
    let expected = parse(&mut whole)?.expect("complete message");

    for split in 1..bytes.len() {
        let mut buf = Marshaller::from_bytes(Endianness::NATIVE, &bytes[..split]);

        assert!(parse(&mut buf)?.is_none(), "split at {split}");
        assert_eq!(buf.tell(), 0);

        buf.extend_from_slice(&bytes[split..]);
        assert_eq!(parse(&mut buf)?.as_ref(), Some(&expected));
        assert_eq!(buf.tell(), bytes.len());
    }

    Ok(())
}

#[test]
fn back_to_back_messages() -> Result<()> {
    let first = notify_call()?;
    let second = Message::signal("/a", "Changed", serial(8))
        .with_interface("org.example.Thing")
        .with_body(Signature::new("as")?, vec![Value::from(vec![Value::from("x")])]);

    let mut bytes = render(&first)?;
    let first_len = bytes.len();
    bytes.extend(render(&second)?);

    let mut buf = Marshaller::from_bytes(Endianness::NATIVE, &bytes);
    assert_eq!(parse(&mut buf)?, Some(first));
    assert_eq!(buf.tell(), first_len);
    assert_eq!(parse(&mut buf)?, Some(second));
    assert_eq!(parse(&mut buf)?, None);
    Ok(())
}

#[test]
fn signal_requires_interface() {
    let signal = Message::signal("/", "Changed", serial(1));
    let error = render(&signal).unwrap_err();
    assert!(error.to_string().contains("INTERFACE"));
}

#[test]
fn body_must_match_signature() -> Result<()> {
    let m = Message::method_call("/", "Call", serial(1))
        .with_body(Signature::new("su")?, vec![Value::from("only one")]);
    assert!(render(&m).is_err());

    let m = Message::method_call("/", "Call", serial(1))
        .with_body(Signature::new("u")?, vec![Value::from("wrong")]);
    assert!(render(&m).unwrap_err().is_type_mismatch());
    Ok(())
}

#[test]
fn zero_serial_is_rejected() {
    let mut bytes = LE_BLOB;
    bytes[8..12].copy_from_slice(&[0, 0, 0, 0]);

    let mut buf = Marshaller::from_bytes(Endianness::NATIVE, &bytes);
    let error = parse(&mut buf).unwrap_err();
    assert!(error.to_string().contains("Zero in header serial"));
    assert_eq!(buf.tell(), 0);
}

#[test]
fn missing_reply_serial_is_rejected() -> Result<()> {
    let m = Message::method_call("/", "Call", serial(1));
    let mut bytes = render(&m)?;

    // Flip the type to METHOD_RETURN, which requires REPLY_SERIAL.
    bytes[1] = 2;

    let mut buf = Marshaller::from_bytes(Endianness::NATIVE, &bytes);
    let error = parse(&mut buf).unwrap_err();
    assert!(error.to_string().contains("REPLY_SERIAL"));

    // The frame length is still known so the message can be skipped.
    assert_eq!(frame_length(buf.get())?, Some(bytes.len()));
    Ok(())
}

#[test]
fn unknown_message_type_is_reported() -> Result<()> {
    let mut bytes = render(&Message::method_call("/", "Call", serial(1)))?;
    bytes[1] = 9;

    let mut buf = Marshaller::from_bytes(Endianness::NATIVE, &bytes);
    let error = parse(&mut buf).unwrap_err();
    assert!(error.to_string().contains("Unknown message type 9"));
    Ok(())
}

#[test]
fn fatal_fixed_header_errors() {
    let mut bytes = LE_BLOB;
    bytes[0] = b'x';
    assert!(frame_length(&bytes).is_err());

    let mut bytes = LE_BLOB;
    bytes[3] = 2;
    assert!(frame_length(&bytes).is_err());

    let mut bytes = LE_BLOB;
    bytes[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(frame_length(&bytes).is_err());

    assert!(matches!(frame_length(&LE_BLOB[..15]), Ok(None)));
}

#[test]
fn body_shorter_than_signature() -> Result<()> {
    let mut bytes = LE_BLOB;
    // Declare a body of length 0 while keeping the `u` signature.
    bytes[4..8].copy_from_slice(&0u32.to_le_bytes());

    let bytes = &bytes[..32];
    let mut buf = Marshaller::from_bytes(Endianness::NATIVE, bytes);
    let error = parse(&mut buf).unwrap_err();
    assert!(error.to_string().contains("declared length"));
    Ok(())
}

#[test]
fn unknown_header_fields_are_skipped() -> Result<()> {
    let m = Message::method_call("/", "Call", serial(3)).with_sender(":1.4");
    let mut bytes = render(&m)?;

    // The SENDER field code is changed into an unknown code.
    let at = bytes
        .windows(4)
        .position(|w| w == [7, 1, b's', 0])
        .expect("sender field");
    bytes[at] = 0x42;

    let mut buf = Marshaller::from_bytes(Endianness::NATIVE, &bytes);
    let parsed = parse(&mut buf)?.expect("complete message");
    assert_eq!(parsed.sender(), None);
    assert_eq!(parsed.member(), Some("Call"));
    assert!(matches!(parsed.kind(), MessageKind::MethodCall { .. }));
    Ok(())
}

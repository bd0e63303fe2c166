use crate::error::Result;
use crate::proto::Endianness;
use crate::{Marshaller, Signature, Type, Value};

fn ty(text: &str) -> Type {
    Type::parse(text).expect("valid type")
}

fn round_trip(endianness: Endianness, value: &Value, text: &str) -> Result<()> {
    let ty = ty(text);
    let mut buf = Marshaller::new(endianness);
    buf.write_value(value, &ty)?;

    let decoded = buf.read_value(&ty)?;
    assert_eq!(&decoded, value, "round trip of {text}");
    assert_eq!(buf.remaining(), 0, "trailing bytes after {text}");
    Ok(())
}

#[test]
fn round_trips() -> Result<()> {
    let values = [
        (Value::from(0xffu8), "y"),
        (Value::from(true), "b"),
        (Value::from(false), "b"),
        (Value::from(-2i16), "n"),
        (Value::from(0xfffeu16), "q"),
        (Value::from(-7i32), "i"),
        (Value::from(0xdeadbeefu32), "u"),
        (Value::from(i64::MIN), "x"),
        (Value::from(u64::MAX), "t"),
        (Value::from(3.25f64), "d"),
        (Value::from("Hello World"), "s"),
        (Value::from(""), "s"),
        (Value::object_path("/org/freedesktop/DBus"), "o"),
        (Value::from(Signature::new("a{sv}")?), "g"),
        (Value::UnixFd(3), "h"),
        (Value::Array(Vec::new()), "ai"),
        (Value::Array(Vec::new()), "a(yt)"),
        (Value::from(vec![Value::from(1u8), Value::from(2u8)]), "ay"),
        (
            Value::from(vec![Value::from(1u64), Value::from(2u64)]),
            "at",
        ),
        (Value::empty_dict(), "a{sv}"),
        (
            Value::from(vec![
                (Value::from("a"), Value::variant(Type::Int32, 1i32)),
                (
                    Value::from("b"),
                    Value::variant(ty("as"), vec![Value::from("x")]),
                ),
            ]),
            "a{sv}",
        ),
        (
            Value::Struct(vec![
                Value::from(1u8),
                Value::from(vec![Value::Struct(vec![
                    Value::from(2u16),
                    Value::from(vec![(Value::from(3u32), Value::from("three"))]),
                ])]),
            ]),
            "(ya(qa{us}))",
        ),
        (
            Value::variant(Type::Variant, Value::variant(Type::String, "inner")),
            "v",
        ),
    ];

    for endianness in [Endianness::LITTLE, Endianness::BIG] {
        for (value, text) in &values {
            round_trip(endianness, value, text)?;
        }
    }

    Ok(())
}

#[test]
fn alignment_from_every_offset() -> Result<()> {
    let cases = [
        (Value::from(1u16), "q", 2),
        (Value::from(1u32), "u", 4),
        (Value::from(1u64), "t", 8),
        (Value::Struct(vec![Value::from(1u8)]), "(y)", 8),
        (Value::from(vec![Value::from(1u64)]), "at", 4),
        (Value::variant(Type::Byte, 1u8), "v", 1),
    ];

    for (value, text, align) in &cases {
        let ty = ty(text);

        for offset in 0..8 {
            let mut buf = Marshaller::new(Endianness::LITTLE);

            for _ in 0..offset {
                buf.write_value(&Value::from(0u8), &Type::Byte)?;
            }

            buf.write_value(value, &ty)?;

            let first = offset + crate::buf::padding_to(offset, *align);
            assert_eq!(first % align, 0);
            assert!(buf.written()[offset..first].iter().all(|&b| b == 0));

            buf.discard(offset)?;
            assert_eq!(buf.read_value(&ty)?, *value);
        }
    }

    Ok(())
}

#[test]
fn array_length_excludes_padding() -> Result<()> {
    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.write_value(
        &Value::from(vec![Value::from(1u64), Value::from(2u64)]),
        &ty("at"),
    )?;

    // 4 length bytes, 4 padding bytes, 2 * 8 element bytes.
    assert_eq!(buf.len(), 24);
    assert_eq!(&buf.written()[..4], &16u32.to_le_bytes());

    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.write_value(&Value::Array(Vec::new()), &ty("at"))?;
    assert_eq!(buf.written(), &[0, 0, 0, 0, 0, 0, 0, 0]);

    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.write_value(
        &Value::from(vec![Value::from("a"), Value::from("bc")]),
        &ty("as"),
    )?;

    // "a": 4 + 2, pad 2, "bc": 4 + 3.
    assert_eq!(&buf.written()[..4], &15u32.to_le_bytes());
    Ok(())
}

#[test]
fn not_enough_data_consumes_nothing() -> Result<()> {
    let value = Value::Struct(vec![
        Value::from("hello"),
        Value::from(vec![(Value::from(1u32), Value::variant(Type::Double, 1.5f64))]),
    ]);
    let ty = ty("(sa{uv})");

    let mut full = Marshaller::new(Endianness::BIG);
    full.write_value(&value, &ty)?;
    let bytes = full.into_vec();

    for split in 0..bytes.len() {
        let mut buf = Marshaller::from_bytes(Endianness::BIG, &bytes[..split]);
        let error = buf.read_value(&ty).unwrap_err();
        assert!(error.not_enough_data(), "split at {split}: {error}");
        assert_eq!(buf.tell(), 0);

        buf.extend_from_slice(&bytes[split..]);
        assert_eq!(buf.read_value(&ty)?, value);
        assert_eq!(buf.tell(), bytes.len());
    }

    Ok(())
}

#[test]
fn invalid_boolean_is_rejected() {
    let mut buf = Marshaller::from_bytes(Endianness::LITTLE, &2u32.to_le_bytes());
    let error = buf.read_value(&Type::Boolean).unwrap_err();
    assert!(error.to_string().contains("Invalid boolean value 2"));
    assert_eq!(buf.tell(), 0);
}

#[test]
fn array_crossing_its_length() {
    let mut buf = Marshaller::new(Endianness::LITTLE);
    // Array claims 6 bytes but holds two u32 elements.
    buf.extend_from_slice(&6u32.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&2u32.to_le_bytes());

    let error = buf.read_value(&ty("au")).unwrap_err();
    assert!(error.to_string().contains("crosses the declared array length"));
}

#[test]
fn duplicate_dict_keys_last_write_wins() -> Result<()> {
    let mut buf = Marshaller::new(Endianness::LITTLE);

    let entries = Value::from(vec![
        Value::Struct(vec![Value::from("a"), Value::from(1i32)]),
        Value::Struct(vec![Value::from("b"), Value::from(2i32)]),
        Value::Struct(vec![Value::from("a"), Value::from(3i32)]),
    ]);

    // Written as an array of structs, which has the same layout.
    buf.write_value(&entries, &ty("a(si)"))?;

    let dict = buf.read_value(&ty("a{si}"))?;

    assert_eq!(
        dict,
        Value::from(vec![
            (Value::from("a"), Value::from(3i32)),
            (Value::from("b"), Value::from(2i32)),
        ])
    );

    assert_eq!(dict.get(&Value::from("a")), Some(&Value::from(3i32)));
    Ok(())
}

#[test]
fn large_dict_with_duplicates() -> Result<()> {
    const KEYS: u32 = 20_000;

    let mut entries = Vec::new();

    for n in 0..KEYS * 2 {
        let key = n % KEYS;
        entries.push(Value::Struct(vec![Value::from(key), Value::from(n)]));
    }

    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.write_value(&Value::from(entries), &ty("a(uu)"))?;

    let dict = buf.read_value(&ty("a{uu}"))?;
    let Value::Dict(entries) = &dict else {
        panic!("expected a dict, got {dict:?}");
    };

    assert_eq!(entries.len(), KEYS as usize);

    for (n, (key, value)) in entries.iter().enumerate() {
        let n = n as u32;
        assert_eq!(key, &Value::from(n));
        assert_eq!(value, &Value::from(n + KEYS));
    }

    Ok(())
}

#[test]
fn dict_keys_distinguish_types() -> Result<()> {
    let mut buf = Marshaller::new(Endianness::LITTLE);

    let entries = Value::from(vec![
        Value::Struct(vec![Value::from(1.5f64), Value::from("first")]),
        Value::Struct(vec![Value::from(-1.5f64), Value::from("second")]),
        Value::Struct(vec![Value::from(1.5f64), Value::from("third")]),
    ]);

    buf.write_value(&entries, &ty("a(ds)"))?;
    let dict = buf.read_value(&ty("a{ds}"))?;

    assert_eq!(
        dict,
        Value::from(vec![
            (Value::from(1.5f64), Value::from("third")),
            (Value::from(-1.5f64), Value::from("second")),
        ])
    );

    Ok(())
}

#[test]
fn invalid_utf8_is_kept_as_bytes() -> Result<()> {
    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.extend_from_slice(&2u32.to_le_bytes());
    buf.extend_from_slice(&[0xff, 0xfe, 0]);
    buf.extend_from_slice(&[0]);
    buf.extend_from_slice(&7u32.to_le_bytes());

    let value = buf.read_value(&ty("(si)"))?;

    assert_eq!(
        value,
        Value::Struct(vec![Value::Unchecked(vec![0xff, 0xfe]), Value::from(7i32)])
    );

    Ok(())
}

#[test]
fn encode_type_mismatch() {
    let mut buf = Marshaller::new(Endianness::LITTLE);

    let error = buf
        .write_value(&Value::from("nope"), &Type::UInt32)
        .unwrap_err();
    assert!(error.is_type_mismatch());
    assert!(buf.is_empty());

    let error = buf
        .write_value(
            &Value::Struct(vec![Value::from(1u8)]),
            &ty("(yy)"),
        )
        .unwrap_err();
    assert!(error.to_string().contains("Expected 2 arguments but found 1"));
    assert!(buf.is_empty());
}

#[test]
fn encode_rejects_invalid_types() {
    let mut buf = Marshaller::new(Endianness::LITTLE);

    let error = buf
        .write_value(&Value::Struct(Vec::new()), &Type::Struct(Vec::new()))
        .unwrap_err();
    assert!(error.is_signature());

    let bad_key = Type::Array(Box::new(Type::DictEntry(
        Box::new(Type::Variant),
        Box::new(Type::Byte),
    )));

    let error = buf
        .write_value(&Value::empty_dict(), &bad_key)
        .unwrap_err();
    assert!(error.is_signature());

    let variant = Value::variant(Type::Struct(Vec::new()), Value::Struct(Vec::new()));
    let error = buf.write_value(&variant, &Type::Variant).unwrap_err();
    assert!(error.is_signature());

    let error = buf.read_value(&bad_key).unwrap_err();
    assert!(error.is_signature());
    assert!(buf.is_empty());
}

#[test]
fn encode_rejects_bad_strings() {
    let mut buf = Marshaller::new(Endianness::LITTLE);

    assert!(buf
        .write_value(&Value::object_path("not/a/path"), &Type::ObjectPath)
        .is_err());
    assert!(buf
        .write_value(&Value::from("nul\0inside"), &Type::String)
        .is_err());
    assert!(buf.is_empty());
}

#[test]
fn variant_depth_is_limited() {
    let mut value = Value::from(1u8);
    let mut ty = Type::Byte;

    for _ in 0..64 {
        value = Value::variant(ty, value);
        ty = Type::Variant;
    }

    let mut buf = Marshaller::new(Endianness::LITTLE);
    assert!(buf.write_value(&value, &ty).is_ok());

    let value = Value::variant(ty.clone(), value);
    let mut buf = Marshaller::new(Endianness::LITTLE);
    let error = buf.write_value(&value, &Type::Variant).unwrap_err();
    assert!(error.is_signature());
}

#[test]
fn base_shifts_alignment() -> Result<()> {
    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.extend_from_slice(&[0xaa; 3]);
    buf.set_base(3);
    buf.write_value(&Value::from(1u32), &Type::UInt32)?;
    assert_eq!(buf.written(), &[0xaa, 0xaa, 0xaa, 1, 0, 0, 0]);

    buf.seek(3);
    assert_eq!(buf.read_value(&Type::UInt32)?, Value::from(1u32));

    buf.seek(3);
    buf.compact();
    assert_eq!(buf.tell(), 0);
    assert_eq!(buf.base(), 0);
    assert_eq!(buf.written(), &[1, 0, 0, 0]);
    Ok(())
}

#[test]
fn base_past_position_counts_as_aligned() -> Result<()> {
    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.extend_from_slice(&[0xbb; 2]);
    buf.set_base(8);

    buf.write_pad(4);
    assert_eq!(buf.len(), 2);

    buf.extend_from_slice(&[0, 0, 0, 0]);
    buf.read_pad(8)?;
    assert_eq!(buf.tell(), 0);

    buf.seek(2);
    assert_eq!(buf.read_value(&Type::UInt32)?, Value::from(0u32));
    assert_eq!(buf.tell(), 6);
    Ok(())
}

#[test]
fn limit_restricts_reads() -> Result<()> {
    let mut buf = Marshaller::new(Endianness::LITTLE);
    buf.write_value(&Value::from(1u32), &Type::UInt32)?;
    buf.write_value(&Value::from(2u32), &Type::UInt32)?;

    buf.set_limit(Some(4));
    assert_eq!(buf.read_value(&Type::UInt32)?, Value::from(1u32));
    assert!(buf.read_value(&Type::UInt32).unwrap_err().not_enough_data());

    buf.set_limit(None);
    assert_eq!(buf.read_value(&Type::UInt32)?, Value::from(2u32));
    Ok(())
}

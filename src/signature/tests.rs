use super::{Signature, SignatureError, Type, MAX_SIGNATURE};

use SignatureError::*;

macro_rules! test {
    ($input:expr, $expected:pat) => {{
        let actual = Signature::from_bytes($input).map(|_| ());

        assert!(
            matches!(actual, $expected),
            "{actual:?} does not match {}",
            stringify!($expected)
        );
    }};
}

#[test]
fn signature_tests() {
    test!(b"", Ok(..));
    test!(b"sss", Ok(..));
    test!(b"i", Ok(..));
    test!(b"b", Ok(..));
    test!(b"ai", Ok(..));
    test!(b"(i)", Ok(..));
    test!(b"a{sv}", Ok(..));
    test!(b"susssasa{sv}i", Ok(..));
    test!(b"w", Err(UnknownTypeCode(b'w')));
    test!(b"z", Err(UnknownTypeCode(b'z')));
    test!(b"a", Err(MissingArrayElementType));
    test!(b"aaaaaa", Err(MissingArrayElementType));
    test!(b"ii(ii)a", Err(MissingArrayElementType));
    test!(b"ia", Err(MissingArrayElementType));
    test!(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaai", Ok(..));
    test!(
        b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaai",
        Err(ExceededMaximumArrayRecursion)
    );
    test!(b")", Err(StructEndedButNotStarted));
    test!(b"}", Err(DictEndedButNotStarted));
    test!(b"i)", Err(StructEndedButNotStarted));
    test!(b"a)", Err(MissingArrayElementType));
    test!(b"(", Err(StructStartedButNotEnded));
    test!(b"(i", Err(StructStartedButNotEnded));
    test!(b"(iiiii", Err(StructStartedButNotEnded));
    test!(b"(ai", Err(StructStartedButNotEnded));
    test!(b"()", Err(StructHasNoFields));
    test!(b"(())", Err(StructHasNoFields));
    test!(b"a()", Err(StructHasNoFields));
    test!(b"i()", Err(StructHasNoFields));
    test!(b"()i", Err(StructHasNoFields));
    test!(b"(a)", Err(MissingArrayElementType));
    test!(b"a{ia}", Err(MissingArrayElementType));
    test!(b"a{}", Err(DictEntryHasNoFields));
    test!(b"a{aii}", Err(DictKeyMustBeBasicType));
    test!(b"a{vi}", Err(DictKeyMustBeBasicType));
    test!(b" ", Err(UnknownTypeCode(..)));
    test!(b"not a valid signature", Err(UnknownTypeCode(..)));
    test!(b"123", Err(UnknownTypeCode(..)));
    test!(b".", Err(UnknownTypeCode(..)));
    test!(b"a{(ii)i}", Err(DictKeyMustBeBasicType));
    test!(b"a{i}", Err(DictEntryHasOnlyOneField));
    test!(b"a{is", Err(DictStartedButNotEnded));
    test!(b"{is}", Err(DictEntryNotInsideArray));
    test!(b"a{isi}", Err(DictEntryHasTooManyFields));
    test!(&[b'i'; 255], Ok(..));
    test!(&[b'i'; MAX_SIGNATURE], Err(SignatureTooLong));
    test! {
        b"((((((((((((((((((((((((((((((((ii))))))))))))))))))))))))))))))))",
        Ok(..)
    };
    test! {
        b"(((((((((((((((((((((((((((((((((ii))))))))))))))))))))))))))))))))",
        Err(ExceededMaximumStructRecursion)
    };
    test!(b"a{s(((((((((((((((((((((((((((((((i)))))))))))))))))))))))))))))))}", Ok(..));
    test!(
        b"a{s((((((((((((((((((((((((((((((((i))))))))))))))))))))))))))))))))}",
        Err(ExceededMaximumStructRecursion)
    );
}

#[test]
fn single_types() {
    assert_eq!(Type::parse("i"), Ok(Type::Int32));
    assert_eq!(Type::parse("ai"), Ok(Type::Array(Box::new(Type::Int32))));
    assert_eq!(
        Type::parse("a{si}"),
        Ok(Type::Array(Box::new(Type::DictEntry(
            Box::new(Type::String),
            Box::new(Type::Int32)
        ))))
    );
    assert_eq!(
        Type::parse("(ii)"),
        Ok(Type::Struct(vec![Type::Int32, Type::Int32]))
    );
    assert_eq!(Type::parse(""), Err(ExpectedSingleCompleteType));
    assert_eq!(Type::parse("is"), Err(TrailingCharacters));
    assert_eq!(Type::parse("a"), Err(MissingArrayElementType));
    assert_eq!(Type::parse("("), Err(StructStartedButNotEnded));
    assert_eq!(Type::parse("z"), Err(UnknownTypeCode(b'z')));
}

#[test]
fn type_properties() -> Result<(), SignatureError> {
    let dict = Type::parse("a{sv}")?;
    assert!(dict.is_dict());
    assert!(!dict.is_basic());
    assert_eq!(dict.alignment(), 4);
    assert_eq!(dict.fixed_size(), None);

    let Type::Array(entry) = &dict else {
        panic!("expected array");
    };

    assert_eq!(entry.alignment(), 8);
    assert!(!Type::Variant.is_basic());
    assert!(Type::ObjectPath.is_basic());
    assert_eq!(Type::Variant.alignment(), 1);
    assert_eq!(Type::Signature.alignment(), 1);
    assert_eq!(Type::Int16.alignment(), 2);
    assert_eq!(Type::Double.alignment(), 8);
    assert_eq!(Type::Boolean.fixed_size(), Some(4));
    Ok(())
}

#[test]
fn display_round_trips_text() -> Result<(), SignatureError> {
    for text in ["", "y", "a(sv)", "a{oa{sa{sv}}}", "(yyyyuua(yv))"] {
        let sig = Signature::new(text)?;
        assert_eq!(sig.as_str(), text);

        let rebuilt = Signature::from_types(sig.types().iter().cloned())?;
        assert_eq!(rebuilt, sig);
    }

    Ok(())
}

#[test]
fn single_type_of_sequence() -> Result<(), SignatureError> {
    assert_eq!(Signature::new("v")?.single_type(), Some(&Type::Variant));
    assert_eq!(Signature::new("vv")?.single_type(), None);
    assert_eq!(Signature::empty().single_type(), None);
    assert!(Signature::empty().is_empty());
    Ok(())
}

#[test]
fn hand_built_types_are_validated() {
    fn array(ty: Type) -> Type {
        Type::Array(Box::new(ty))
    }

    fn entry(key: Type, value: Type) -> Type {
        Type::DictEntry(Box::new(key), Box::new(value))
    }

    let cases = [
        (Type::Struct(Vec::new()), StructHasNoFields),
        (array(Type::Struct(Vec::new())), StructHasNoFields),
        (entry(Type::String, Type::Byte), DictEntryNotInsideArray),
        (
            Type::Struct(vec![entry(Type::String, Type::Byte)]),
            DictEntryNotInsideArray,
        ),
        (array(entry(Type::Variant, Type::Byte)), DictKeyMustBeBasicType),
        (
            array(entry(array(Type::Byte), Type::Byte)),
            DictKeyMustBeBasicType,
        ),
    ];

    for (ty, expected) in cases {
        assert_eq!(ty.validate(), Err(expected.clone()), "{ty:?}");
        assert_eq!(Signature::from_types([ty]), Err(expected));
    }

    let mut deep = Type::Byte;

    for _ in 0..33 {
        deep = array(deep);
    }

    assert_eq!(deep.validate(), Err(ExceededMaximumArrayRecursion));

    let mut deep = Type::Byte;

    for _ in 0..33 {
        deep = Type::Struct(vec![deep]);
    }

    assert_eq!(deep.validate(), Err(ExceededMaximumStructRecursion));

    let wide = Type::Struct(vec![Type::Byte; MAX_SIGNATURE]);
    assert_eq!(wide.validate(), Err(SignatureTooLong));

    let valid = array(entry(Type::String, Type::Variant));
    assert_eq!(valid.validate(), Ok(()));
    assert_eq!(valid.signature_len(), "a{sv}".len());
}

use std::error;
use std::fmt;

use crate::proto::TypeCode;

/// Detailed errors raised when parsing a [`Signature`] fails.
///
/// [`Signature`]: crate::Signature
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignatureError {
    UnknownTypeCode(u8),
    SignatureTooLong,
    MissingArrayElementType,
    StructEndedButNotStarted,
    DictEndedButNotStarted,
    StructStartedButNotEnded,
    DictStartedButNotEnded,
    StructHasNoFields,
    DictKeyMustBeBasicType,
    DictEntryHasNoFields,
    DictEntryHasOnlyOneField,
    DictEntryNotInsideArray,
    DictEntryHasTooManyFields,
    ExceededMaximumArrayRecursion,
    ExceededMaximumStructRecursion,
    ExceededMaximumDepth,
    ExpectedSingleCompleteType,
    TrailingCharacters,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SignatureError::UnknownTypeCode(code) => {
                write!(f, "Unknown type code: {:?}", TypeCode::new(code))
            }
            SignatureError::SignatureTooLong => write!(f, "Signature too long"),
            SignatureError::MissingArrayElementType => write!(f, "Missing array element type"),
            SignatureError::StructEndedButNotStarted => write!(f, "Struct ended but not started"),
            SignatureError::DictEndedButNotStarted => write!(f, "Dict ended but not started"),
            SignatureError::StructStartedButNotEnded => write!(f, "Struct started but not ended"),
            SignatureError::DictStartedButNotEnded => write!(f, "Dict started but not ended"),
            SignatureError::StructHasNoFields => write!(f, "Struct has no fields"),
            SignatureError::DictKeyMustBeBasicType => write!(f, "Dict key must be basic type"),
            SignatureError::DictEntryHasNoFields => write!(f, "Dict entry has no fields"),
            SignatureError::DictEntryHasOnlyOneField => write!(f, "Dict entry has only one field"),
            SignatureError::DictEntryNotInsideArray => write!(f, "Dict entry not inside array"),
            SignatureError::DictEntryHasTooManyFields => {
                write!(f, "Dict entry has too many fields")
            }
            SignatureError::ExceededMaximumArrayRecursion => {
                write!(f, "Exceeded maximum array recursion")
            }
            SignatureError::ExceededMaximumStructRecursion => {
                write!(f, "Exceeded maximum struct recursion")
            }
            SignatureError::ExceededMaximumDepth => {
                write!(f, "Exceeded maximum container depth")
            }
            SignatureError::ExpectedSingleCompleteType => {
                write!(f, "Expected a single complete type")
            }
            SignatureError::TrailingCharacters => {
                write!(f, "Trailing characters after complete type")
            }
        }
    }
}

impl error::Error for SignatureError {}

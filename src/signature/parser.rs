use crate::proto::TypeCode;

use super::{SignatureError, Type, MAX_CONTAINER_DEPTH, MAX_SIGNATURE};

/// Recursive descent parser over the bytes of a signature.
pub(crate) struct SignatureParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    arrays: usize,
    structs: usize,
}

impl<'a> SignatureParser<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Result<Self, SignatureError> {
        if bytes.len() >= MAX_SIGNATURE {
            return Err(SignatureError::SignatureTooLong);
        }

        Ok(Self {
            bytes,
            pos: 0,
            arrays: 0,
            structs: 0,
        })
    }

    /// Test if all input has been consumed.
    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Parse the next complete type, or `None` if the input is exhausted.
    pub(crate) fn next_type(&mut self) -> Result<Option<Type>, SignatureError> {
        let Some(code) = self.peek() else {
            return Ok(None);
        };

        self.pos += 1;

        let ty = match code {
            TypeCode::ARRAY => self.array()?,
            TypeCode::OPEN_PAREN => self.structure()?,
            TypeCode::CLOSE_PAREN => return Err(SignatureError::StructEndedButNotStarted),
            TypeCode::OPEN_BRACE => return Err(SignatureError::DictEntryNotInsideArray),
            TypeCode::CLOSE_BRACE => return Err(SignatureError::DictEndedButNotStarted),
            code => match Type::from_code(code) {
                Some(ty) => ty,
                None => return Err(SignatureError::UnknownTypeCode(code.get())),
            },
        };

        Ok(Some(ty))
    }

    fn peek(&self) -> Option<TypeCode> {
        self.bytes.get(self.pos).map(|&b| TypeCode::new(b))
    }

    fn array(&mut self) -> Result<Type, SignatureError> {
        self.arrays += 1;

        if self.arrays > MAX_CONTAINER_DEPTH {
            return Err(SignatureError::ExceededMaximumArrayRecursion);
        }

        let element = match self.peek() {
            None | Some(TypeCode::CLOSE_PAREN | TypeCode::CLOSE_BRACE) => {
                return Err(SignatureError::MissingArrayElementType);
            }
            Some(TypeCode::OPEN_BRACE) => {
                self.pos += 1;
                self.dict_entry()?
            }
            Some(..) => self.required(SignatureError::MissingArrayElementType)?,
        };

        self.arrays -= 1;
        Ok(Type::Array(Box::new(element)))
    }

    fn structure(&mut self) -> Result<Type, SignatureError> {
        self.enter_struct()?;

        let mut fields = Vec::new();

        loop {
            match self.peek() {
                None => return Err(SignatureError::StructStartedButNotEnded),
                Some(TypeCode::CLOSE_PAREN) => {
                    self.pos += 1;
                    break;
                }
                Some(..) => {
                    fields.push(self.required(SignatureError::StructStartedButNotEnded)?);
                }
            }
        }

        if fields.is_empty() {
            return Err(SignatureError::StructHasNoFields);
        }

        self.structs -= 1;
        Ok(Type::Struct(fields))
    }

    fn dict_entry(&mut self) -> Result<Type, SignatureError> {
        self.enter_struct()?;

        match self.peek() {
            None => return Err(SignatureError::DictStartedButNotEnded),
            Some(TypeCode::CLOSE_BRACE) => return Err(SignatureError::DictEntryHasNoFields),
            Some(..) => {}
        }

        let key = self.required(SignatureError::DictStartedButNotEnded)?;

        if !key.is_basic() {
            return Err(SignatureError::DictKeyMustBeBasicType);
        }

        match self.peek() {
            None => return Err(SignatureError::DictStartedButNotEnded),
            Some(TypeCode::CLOSE_BRACE) => return Err(SignatureError::DictEntryHasOnlyOneField),
            Some(..) => {}
        }

        let value = self.required(SignatureError::DictStartedButNotEnded)?;

        match self.peek() {
            None => return Err(SignatureError::DictStartedButNotEnded),
            Some(TypeCode::CLOSE_BRACE) => {
                self.pos += 1;
            }
            Some(..) => return Err(SignatureError::DictEntryHasTooManyFields),
        }

        self.structs -= 1;
        Ok(Type::DictEntry(Box::new(key), Box::new(value)))
    }

    fn enter_struct(&mut self) -> Result<(), SignatureError> {
        self.structs += 1;

        if self.structs > MAX_CONTAINER_DEPTH {
            return Err(SignatureError::ExceededMaximumStructRecursion);
        }

        Ok(())
    }

    fn required(&mut self, missing: SignatureError) -> Result<Type, SignatureError> {
        match self.next_type()? {
            Some(ty) => Ok(ty),
            None => Err(missing),
        }
    }
}

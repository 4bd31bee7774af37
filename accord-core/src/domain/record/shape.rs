use crate::domain::plutus::data::{constr_index, TAG_CONSTR_GENERAL};
use crate::domain::plutus::CborValue;
use crate::foundation::DecodeError;

const KEY_CONSTRUCTOR: &str = "constructor";
const KEY_FIELDS: &str = "fields";

/// The container shapes a record or redeemer may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape<'a> {
    /// Tag 121.. / 1280.., or tag 102 wrapping `[index, fields]`.
    Tagged { index: u64, fields: &'a [CborValue] },
    /// A bare positional list.
    List(&'a [CborValue]),
    /// `{"constructor": index, "fields": [...]}`.
    Explicit { index: u64, fields: &'a [CborValue] },
}

impl<'a> RecordShape<'a> {
    pub fn classify(value: &'a CborValue) -> Result<Self, DecodeError> {
        match value {
            CborValue::Tag(TAG_CONSTR_GENERAL, inner) => match inner.as_ref() {
                CborValue::Array(pair) => match pair.as_slice() {
                    [CborValue::Unsigned(index), CborValue::Array(fields)] => Ok(RecordShape::Tagged { index: *index, fields }),
                    _ => Err(DecodeError::UnexpectedShape("tag 102 must wrap [index, fields]".to_string())),
                },
                other => Err(DecodeError::UnexpectedShape(format!("tag 102 wraps {}", other.kind()))),
            },
            CborValue::Tag(tag, inner) => {
                let index = constr_index(*tag).ok_or_else(|| DecodeError::UnexpectedShape(format!("tag {} is not a constructor", tag)))?;
                match inner.as_ref() {
                    CborValue::Array(fields) => Ok(RecordShape::Tagged { index, fields }),
                    other => Err(DecodeError::UnexpectedShape(format!("constructor tag {} wraps {}", tag, other.kind()))),
                }
            }
            CborValue::Array(items) => Ok(RecordShape::List(items)),
            CborValue::Map(entries) => Self::explicit(entries),
            other => Err(DecodeError::UnexpectedShape(format!("top-level {}", other.kind()))),
        }
    }

    fn explicit(entries: &'a [(CborValue, CborValue)]) -> Result<Self, DecodeError> {
        let lookup = |name: &str| entries.iter().find(|(key, _)| key.as_text() == Some(name)).map(|(_, value)| value);
        let index = match lookup(KEY_CONSTRUCTOR) {
            Some(CborValue::Unsigned(index)) => *index,
            Some(other) => return Err(DecodeError::UnexpectedShape(format!("constructor index is {}", other.kind()))),
            None => return Err(DecodeError::UnexpectedShape("map without constructor key".to_string())),
        };
        match lookup(KEY_FIELDS) {
            Some(CborValue::Array(fields)) => Ok(RecordShape::Explicit { index, fields }),
            Some(other) => Err(DecodeError::UnexpectedShape(format!("constructor fields are {}", other.kind()))),
            None => Err(DecodeError::UnexpectedShape("map without fields key".to_string())),
        }
    }

    /// Fields of constructor 0; any other index is not a record.
    pub fn constructor_zero_fields(self) -> Result<&'a [CborValue], DecodeError> {
        match self {
            RecordShape::List(fields) => Ok(fields),
            RecordShape::Tagged { index: 0, fields } | RecordShape::Explicit { index: 0, fields } => Ok(fields),
            RecordShape::Tagged { index, .. } | RecordShape::Explicit { index, .. } => {
                Err(DecodeError::UnexpectedShape(format!("constructor index {} (expected 0)", index)))
            }
        }
    }
}

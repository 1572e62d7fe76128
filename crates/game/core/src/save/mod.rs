//! The ordered-field persistence contract.
//!
//! Every stateful component serializes to an ordered sequence of typed,
//! named fields and must read that exact sequence back, field for field.
//! The schema is declared per type in [`schema`] rather than derived, so
//! adding or removing a field is a compile-checked change to that type's
//! [`Persist`] impl. Field names and types are verified on decode; any
//! mismatch aborts the whole load without partial mutation.
//!
//! The concrete byte encoding is not this module's concern: a field stream
//! is plain data, and the runtime layer encodes it with whatever codec it
//! likes.

mod schema;

/// A typed field payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    I32(i32),
    U8(u8),
    Bool(bool),
    Str(String),
    Ids(Vec<u16>),
}

impl FieldValue {
    /// Name of the payload type, for mismatch diagnostics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::I32(_) => "i32",
            Self::U8(_) => "u8",
            Self::Bool(_) => "bool",
            Self::Str(_) => "str",
            Self::Ids(_) => "ids",
        }
    }
}

/// One named field in a component's persisted stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Integrity failures raised while decoding a field stream.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    /// The stream ended before the expected field.
    #[error("field stream ended while expecting `{expected}`")]
    UnexpectedEnd { expected: &'static str },

    /// The next field's name does not match the schema.
    #[error("expected field `{expected}`, found `{found}`")]
    FieldMismatch {
        expected: &'static str,
        found: String,
    },

    /// The next field's payload type does not match the schema.
    #[error("field `{field}` holds a {found} value")]
    TypeMismatch {
        field: &'static str,
        found: &'static str,
    },

    /// A field decoded to a value outside its domain.
    #[error("field `{field}` holds invalid value {value}")]
    InvalidValue { field: &'static str, value: String },

    /// The stream holds more fields than the schema declares.
    #[error("{count} unread trailing field(s) in stream")]
    TrailingFields { count: usize },
}

/// Accumulates a component's ordered field stream.
#[derive(Debug, Default)]
pub struct FieldWriter {
    fields: Vec<Field>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    fn push(&mut self, name: &'static str, value: FieldValue) {
        self.fields.push(Field {
            name: name.to_owned(),
            value,
        });
    }

    pub fn write_i32(&mut self, name: &'static str, value: i32) {
        self.push(name, FieldValue::I32(value));
    }

    pub fn write_u8(&mut self, name: &'static str, value: u8) {
        self.push(name, FieldValue::U8(value));
    }

    pub fn write_bool(&mut self, name: &'static str, value: bool) {
        self.push(name, FieldValue::Bool(value));
    }

    pub fn write_str(&mut self, name: &'static str, value: &str) {
        self.push(name, FieldValue::Str(value.to_owned()));
    }

    pub fn write_ids(&mut self, name: &'static str, value: Vec<u16>) {
        self.push(name, FieldValue::Ids(value));
    }
}

/// Sequential, schema-checked reader over a persisted field stream.
#[derive(Debug)]
pub struct FieldReader<'a> {
    fields: &'a [Field],
    cursor: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a [Field]) -> Self {
        Self { fields, cursor: 0 }
    }

    fn next(&mut self, expected: &'static str) -> Result<&'a FieldValue, SaveError> {
        let field = self
            .fields
            .get(self.cursor)
            .ok_or(SaveError::UnexpectedEnd { expected })?;
        if field.name != expected {
            return Err(SaveError::FieldMismatch {
                expected,
                found: field.name.clone(),
            });
        }
        self.cursor += 1;
        Ok(&field.value)
    }

    pub fn read_i32(&mut self, name: &'static str) -> Result<i32, SaveError> {
        match self.next(name)? {
            FieldValue::I32(v) => Ok(*v),
            other => Err(SaveError::TypeMismatch {
                field: name,
                found: other.kind(),
            }),
        }
    }

    pub fn read_u8(&mut self, name: &'static str) -> Result<u8, SaveError> {
        match self.next(name)? {
            FieldValue::U8(v) => Ok(*v),
            other => Err(SaveError::TypeMismatch {
                field: name,
                found: other.kind(),
            }),
        }
    }

    pub fn read_bool(&mut self, name: &'static str) -> Result<bool, SaveError> {
        match self.next(name)? {
            FieldValue::Bool(v) => Ok(*v),
            other => Err(SaveError::TypeMismatch {
                field: name,
                found: other.kind(),
            }),
        }
    }

    pub fn read_str(&mut self, name: &'static str) -> Result<&'a str, SaveError> {
        match self.next(name)? {
            FieldValue::Str(v) => Ok(v),
            other => Err(SaveError::TypeMismatch {
                field: name,
                found: other.kind(),
            }),
        }
    }

    pub fn read_ids(&mut self, name: &'static str) -> Result<&'a [u16], SaveError> {
        match self.next(name)? {
            FieldValue::Ids(v) => Ok(v),
            other => Err(SaveError::TypeMismatch {
                field: name,
                found: other.kind(),
            }),
        }
    }

    /// A non-negative `i32` field narrowed to `u32`.
    pub fn read_count(&mut self, name: &'static str) -> Result<u32, SaveError> {
        let raw = self.read_i32(name)?;
        u32::try_from(raw).map_err(|_| SaveError::InvalidValue {
            field: name,
            value: raw.to_string(),
        })
    }

    /// Declares the schema complete; trailing fields are an integrity
    /// failure.
    pub fn finish(self) -> Result<(), SaveError> {
        let remaining = self.fields.len() - self.cursor;
        if remaining == 0 {
            Ok(())
        } else {
            Err(SaveError::TrailingFields { count: remaining })
        }
    }
}

/// Per-type persisted field schema.
///
/// `write_fields` and `read_fields` must enumerate the same fields in the
/// same order; the reader enforces it. Nested components (a card inside
/// the regulator's stream) share the enclosing reader rather than owning
/// a sub-stream, so the field order stays one flat, checkable sequence.
pub trait Persist: Sized {
    /// Stable tag naming this component's block in a multi-component save.
    const TAG: &'static str;

    fn write_fields(&self, writer: &mut FieldWriter);

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError>;

    /// The component's complete field stream.
    fn to_fields(&self) -> Vec<Field> {
        let mut writer = FieldWriter::new();
        self.write_fields(&mut writer);
        writer.into_fields()
    }

    /// Decodes a complete field stream, rejecting trailing fields.
    fn from_fields(fields: &[Field]) -> Result<Self, SaveError> {
        let mut reader = FieldReader::new(fields);
        let value = Self::read_fields(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

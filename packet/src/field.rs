//! Typed fields packed back-to-back, little-endian, into flat buffers.
//!
//! The same codec serves instruction/status parameters and control-table memory.

use {
    crate::error::Error,
    alloc::{
        borrow::ToOwned,
        collections::{btree_map, BTreeMap},
        string::String,
        vec::Vec,
    },
    core::fmt,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    /// Exactly this many raw bytes.
    Fixed(usize),
    /// Every byte left in the buffer. Only legal as the last field of a layout.
    Greedy,
}

impl FieldType {
    /// Bytes this field occupies, or `None` for [`FieldType::Greedy`].
    #[inline]
    pub const fn width(self) -> Option<usize> {
        Some(match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 => 4,
            Self::Fixed(n) => n,
            Self::Greedy => return None,
        })
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Fixed(_) | Self::Greedy)
    }

    /// Inclusive bounds of an integer field.
    #[inline]
    const fn bounds(self) -> Option<(i64, i64)> {
        Some(match self {
            Self::U8 => (0, u8::MAX as i64),
            Self::U16 => (0, u16::MAX as i64),
            Self::U32 => (0, u32::MAX as i64),
            Self::I8 => (i8::MIN as i64, i8::MAX as i64),
            Self::I16 => (i16::MIN as i64, i16::MAX as i64),
            Self::I32 => (i32::MIN as i64, i32::MAX as i64),
            Self::Fixed(_) | Self::Greedy => return None,
        })
    }
}

impl fmt::Display for FieldType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::I8 => write!(f, "i8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
            Self::Fixed(n) => write!(f, "[u8; {n}]"),
            Self::Greedy => write!(f, "[u8]"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

impl Field {
    #[inline(always)]
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }

    /// Append `value` to `out` at this field's width.
    pub fn encode(&self, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        let Self { name, ty } = *self;
        match (ty, value) {
            (FieldType::Fixed(expected), &Value::Bytes(ref bytes)) => {
                if bytes.len() != expected {
                    return Err(Error::FixedLength {
                        name,
                        expected,
                        actual: bytes.len(),
                    });
                }
                out.extend_from_slice(bytes);
            }
            (FieldType::Greedy, &Value::Bytes(ref bytes)) => out.extend_from_slice(bytes),
            (FieldType::Fixed(_) | FieldType::Greedy, &Value::Integer(_)) => {
                return Err(Error::WrongValueType { name, expected: ty });
            }
            (_, &Value::Bytes(_)) => return Err(Error::WrongValueType { name, expected: ty }),
            (_, &Value::Integer(value)) => {
                let (Some((lo, hi)), Some(width)) = (ty.bounds(), ty.width()) else {
                    return Err(Error::WrongValueType { name, expected: ty });
                };
                if !(lo..=hi).contains(&value) {
                    return Err(Error::OutOfRange {
                        name,
                        value,
                        field_type: ty,
                    });
                }
                // Two's complement truncation to the low `width` bytes.
                out.extend_from_slice(&(value as u32).to_le_bytes()[..width]);
            }
        }
        Ok(())
    }

    /// Read this field from the front of `buffer`, returning the value and the
    /// number of bytes consumed.
    pub fn decode(&self, buffer: &[u8]) -> Result<(Value, usize), Error> {
        let Self { name, ty } = *self;
        let Some(width) = ty.width() else {
            return Ok((Value::Bytes(buffer.to_vec()), buffer.len()));
        };
        let Some(bytes) = buffer.get(..width) else {
            return Err(Error::Truncated {
                name,
                needed: width,
                remaining: buffer.len(),
            });
        };
        let value = match ty {
            FieldType::U8 => Value::Integer(bytes[0].into()),
            FieldType::U16 => Value::Integer(u16::from_le_bytes([bytes[0], bytes[1]]).into()),
            FieldType::U32 => Value::Integer(
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).into(),
            ),
            FieldType::I8 => Value::Integer(i8::from_le_bytes([bytes[0]]).into()),
            FieldType::I16 => Value::Integer(i16::from_le_bytes([bytes[0], bytes[1]]).into()),
            FieldType::I32 => Value::Integer(
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).into(),
            ),
            FieldType::Fixed(_) | FieldType::Greedy => Value::Bytes(bytes.to_vec()),
        };
        Ok((value, width))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// A greedy field is followed by another field.
    #[error("greedy field `{name}` must be the last field of its layout")]
    GreedyNotLast { name: &'static str },
}

/// An ordered list of fields with at most one greedy field, which comes last.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout(&'static [Field]);

impl Layout {
    pub const EMPTY: Self = Self(&[]);

    #[inline]
    pub const fn new(fields: &'static [Field]) -> Result<Self, LayoutError> {
        let mut i = 0;
        while i < fields.len() {
            if matches!(fields[i].ty, FieldType::Greedy) && i + 1 != fields.len() {
                return Err(LayoutError::GreedyNotLast {
                    name: fields[i].name,
                });
            }
            i += 1;
        }
        Ok(Self(fields))
    }

    /// [`Layout::new`] for static tables: a misplaced greedy field fails the build.
    #[inline]
    pub const fn checked(fields: &'static [Field]) -> Self {
        match Self::new(fields) {
            Ok(layout) => layout,
            Err(LayoutError::GreedyNotLast { .. }) => {
                panic!("greedy field must be the last field of its layout")
            }
        }
    }

    #[inline(always)]
    pub const fn fields(&self) -> &'static [Field] {
        self.0
    }

    /// Bytes taken by every non-greedy field.
    #[inline]
    pub fn fixed_width(&self) -> usize {
        self.0.iter().filter_map(|field| field.ty.width()).sum()
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Value {
    Integer(i64),
    Bytes(Vec<u8>),
}

impl Value {
    #[inline]
    pub const fn as_integer(&self) -> Option<i64> {
        match *self {
            Self::Integer(i) => Some(i),
            Self::Bytes(_) => None,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Self::Integer(_) => None,
            Self::Bytes(ref bytes) => Some(bytes),
        }
    }
}

impl fmt::Display for Value {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Bytes(ref bytes) => write!(f, "{bytes:02X?}"),
        }
    }
}

macro_rules! from_integer {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                #[inline(always)]
                fn from(value: $t) -> Self {
                    Self::Integer(value.into())
                }
            }
        )+
    };
}

from_integer!(u8, u16, u32, i8, i16, i32, i64, bool);

impl From<Vec<u8>> for Value {
    #[inline(always)]
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    #[inline(always)]
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    #[inline(always)]
    fn from(value: [u8; N]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

/// Field values by name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    #[inline(always)]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[inline]
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        let _: Option<Value> = self.insert(name, value);
        self
    }

    #[inline]
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.to_owned(), value.into())
    }

    #[inline]
    pub fn get(&self, name: &str) -> Result<&Value, Error> {
        self.0.get(name).ok_or_else(|| Error::UnknownField {
            name: name.to_owned(),
        })
    }

    #[inline]
    pub fn integer(&self, name: &str) -> Result<i64, Error> {
        match *self.get(name)? {
            Value::Integer(i) => Ok(i),
            Value::Bytes(_) => Err(Error::UnknownField {
                name: name.to_owned(),
            }),
        }
    }

    #[inline]
    pub fn bytes(&self, name: &str) -> Result<&[u8], Error> {
        match *self.get(name)? {
            Value::Bytes(ref bytes) => Ok(bytes),
            Value::Integer(_) => Err(Error::UnknownField {
                name: name.to_owned(),
            }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: AsRef<str>, V: Into<Value>> FromIterator<(S, V)> for Fields {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.as_ref().to_owned(), value.into()))
                .collect(),
        )
    }
}

/// Pack `values` in `layout` order. Values without a field in the layout are ignored.
pub fn pack(values: &Fields, layout: &Layout) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(layout.fixed_width());
    for field in layout.fields() {
        let value = values
            .0
            .get(field.name)
            .ok_or(Error::MissingField { name: field.name })?;
        field.encode(value, &mut out)?;
    }
    Ok(out)
}

/// Unpack `buffer` in `layout` order; every byte must be claimed by some field.
pub fn unpack(buffer: &[u8], layout: &Layout) -> Result<Fields, Error> {
    let mut values = Fields::new();
    let mut rest = buffer;
    for field in layout.fields() {
        let (value, consumed) = field.decode(rest)?;
        rest = &rest[consumed..];
        let _: Option<Value> = values.0.insert(field.name.to_owned(), value);
    }
    if !rest.is_empty() {
        return Err(Error::TrailingBytes { count: rest.len() });
    }
    Ok(values)
}

//! Interface constants and their script-facing values.

use ordered_float::OrderedFloat;

use crate::TypeTag;

/// The value of an interface constant as stored in the typelib.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Char(u8),
    WChar(u16),
    /// A narrow string constant.
    String(String),
}

impl ConstantValue {
    /// The typelib tag of this value.
    pub fn tag(&self) -> TypeTag {
        match self {
            ConstantValue::Int8(_) => TypeTag::Int8,
            ConstantValue::Int16(_) => TypeTag::Int16,
            ConstantValue::Int32(_) => TypeTag::Int32,
            ConstantValue::Int64(_) => TypeTag::Int64,
            ConstantValue::Uint8(_) => TypeTag::Uint8,
            ConstantValue::Uint16(_) => TypeTag::Uint16,
            ConstantValue::Uint32(_) => TypeTag::Uint32,
            ConstantValue::Uint64(_) => TypeTag::Uint64,
            ConstantValue::Bool(_) => TypeTag::Bool,
            ConstantValue::Char(_) => TypeTag::Char,
            ConstantValue::WChar(_) => TypeTag::WChar,
            ConstantValue::String(_) => TypeTag::CharStr,
        }
    }

    /// Convert to the value a script engine sees.
    ///
    /// Integers up to 32 bits become `Int32` when they fit and `Number`
    /// otherwise. Anything else has no script representation and converts to
    /// `Undefined`.
    pub fn to_dynamic(&self) -> DynamicValue {
        match *self {
            ConstantValue::Int8(v) => DynamicValue::Int32(v.into()),
            ConstantValue::Uint8(v) => DynamicValue::Int32(v.into()),
            ConstantValue::Int16(v) => DynamicValue::Int32(v.into()),
            ConstantValue::Uint16(v) => DynamicValue::Int32(v.into()),
            ConstantValue::Int32(v) => DynamicValue::Int32(v),
            ConstantValue::Uint32(v) => match i32::try_from(v) {
                Ok(small) => DynamicValue::Int32(small),
                Err(_) => DynamicValue::Number(OrderedFloat(f64::from(v))),
            },
            _ => {
                tracing::warn!(tag = ?self.tag(), "constant has no script value");
                DynamicValue::Undefined
            }
        }
    }
}

/// A script-engine value produced from a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicValue {
    Undefined,
    Int32(i32),
    Number(OrderedFloat<f64>),
}

impl DynamicValue {
    /// Numeric view, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Undefined => None,
            DynamicValue::Int32(v) => Some(f64::from(*v)),
            DynamicValue::Number(v) => Some(v.into_inner()),
        }
    }
}

/// A named constant declared on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstDescriptor {
    pub name: String,
    pub value: ConstantValue,
}

impl ConstDescriptor {
    pub fn new(name: impl Into<String>, value: ConstantValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Shorthand for `self.value.to_dynamic()`.
    pub fn to_dynamic(&self) -> DynamicValue {
        self.value.to_dynamic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integers_become_int32() {
        assert_eq!(ConstantValue::Int8(-3).to_dynamic(), DynamicValue::Int32(-3));
        assert_eq!(ConstantValue::Uint8(200).to_dynamic(), DynamicValue::Int32(200));
        assert_eq!(ConstantValue::Int16(-300).to_dynamic(), DynamicValue::Int32(-300));
        assert_eq!(ConstantValue::Uint16(65535).to_dynamic(), DynamicValue::Int32(65535));
        assert_eq!(ConstantValue::Int32(i32::MIN).to_dynamic(), DynamicValue::Int32(i32::MIN));
    }

    #[test]
    fn large_uint32_becomes_number() {
        assert_eq!(ConstantValue::Uint32(7).to_dynamic(), DynamicValue::Int32(7));
        let big = ConstantValue::Uint32(0x8000_0000).to_dynamic();
        assert_eq!(big, DynamicValue::Number(OrderedFloat(2147483648.0)));
        assert_eq!(big.as_f64(), Some(2147483648.0));
    }

    #[test]
    fn non_numeric_is_undefined() {
        assert_eq!(ConstantValue::Bool(true).to_dynamic(), DynamicValue::Undefined);
        assert_eq!(ConstantValue::Int64(1).to_dynamic(), DynamicValue::Undefined);
        assert_eq!(
            ConstantValue::String("x".into()).to_dynamic(),
            DynamicValue::Undefined
        );
        assert_eq!(DynamicValue::Undefined.as_f64(), None);
    }

    #[test]
    fn const_descriptor_tag() {
        let c = ConstDescriptor::new("MAX", ConstantValue::Uint16(10));
        assert_eq!(c.value.tag(), TypeTag::Uint16);
        assert_eq!(c.to_dynamic(), DynamicValue::Int32(10));
    }
}

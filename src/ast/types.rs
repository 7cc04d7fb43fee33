// This module defines the sized type descriptors attached to every declaration and expression
// once semantic analysis has run. SizedType is a closed sum of Direct (scalar basic types),
// Array (fixed or dynamic) and Function types. Each variant carries size_in_bits, filled in
// by the semantic stage and only ever read by the bytecode generator: layout divides it into
// bytes, the register allocator divides it into 64-bit slots and the store splitter walks it
// in 64-bit chunks. The constructors here compute the conventional sizes (strings and dynamic
// arrays are a two-word {pointer, length} pair, function values are a single pointer).

//! Sized type descriptors.

use std::fmt;

use thiserror::Error;

/// Size of a pointer-sized value (function values, string data reference).
pub const POINTER_BITS: u32 = 64;

/// Scalar types a [`DirectType`] can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Bool,
    String,
    S8,
    S16,
    S32,
    S64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl BasicType {
    /// Natural size of the type in bits.
    pub const fn size_in_bits(self) -> u32 {
        use BasicType::*;
        match self {
            Bool | S8 | U8 => 8,
            S16 | U16 => 16,
            S32 | U32 | F32 => 32,
            S64 | U64 | F64 => 64,
            String => 2 * POINTER_BITS,
        }
    }

    pub const fn is_integer(self) -> bool {
        use BasicType::*;
        matches!(self, S8 | S16 | S32 | S64 | U8 | U16 | U32 | U64)
    }

    pub const fn is_signed(self) -> bool {
        use BasicType::*;
        matches!(self, S8 | S16 | S32 | S64)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, BasicType::F32 | BasicType::F64)
    }

    /// Source spelling of the type.
    pub const fn name(self) -> &'static str {
        use BasicType::*;
        match self {
            Bool => "bool",
            String => "string",
            S8 => "s8",
            S16 => "s16",
            S32 => "s32",
            S64 => "s64",
            U8 => "u8",
            U16 => "u16",
            U32 => "u32",
            U64 => "u64",
            F32 => "f32",
            F64 => "f64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use BasicType::*;
        Some(match name {
            "bool" => Bool,
            "string" => String,
            "s8" => S8,
            "s16" => S16,
            "s32" => S32,
            "s64" => S64,
            "u8" => U8,
            "u16" => U16,
            "u32" => U32,
            "u64" => U64,
            "f32" => F32,
            "f64" => F64,
            _ => return None,
        })
    }
}

/// A basic scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectType {
    pub basic: BasicType,
    pub size_in_bits: u32,
}

impl DirectType {
    pub fn new(basic: BasicType) -> Self {
        Self {
            basic,
            size_in_bits: basic.size_in_bits(),
        }
    }
}

/// A fixed array whose total size does not fit the `u32` bit count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("array of {count} elements of {element_bits} bits is too large")]
pub struct ArrayTooLarge {
    pub count: u64,
    pub element_bits: u32,
}

/// Array of `element`, either with a fixed element count or dynamic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub element: Box<SizedType>,
    pub count: Option<u64>,
    pub is_dynamic: bool,
    pub size_in_bits: u32,
}

impl ArrayType {
    /// Fixed-size array stored inline.
    pub fn fixed(element: SizedType, count: u64) -> Result<Self, ArrayTooLarge> {
        let element_bits = element.size_in_bits();
        let size_in_bits = u64::from(element_bits)
            .checked_mul(count)
            .and_then(|bits| u32::try_from(bits).ok())
            .ok_or(ArrayTooLarge { count, element_bits })?;
        Ok(Self {
            element: Box::new(element),
            count: Some(count),
            is_dynamic: false,
            size_in_bits,
        })
    }

    /// Dynamic array, represented as {data pointer, element count}.
    pub fn dynamic(element: SizedType) -> Self {
        Self {
            element: Box::new(element),
            count: None,
            is_dynamic: true,
            size_in_bits: 2 * POINTER_BITS,
        }
    }
}

/// Signature of a function value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub params: Vec<SizedType>,
    pub return_type: Option<Box<SizedType>>,
    pub is_foreign: bool,
    pub is_variadic: bool,
    pub size_in_bits: u32,
}

impl FunctionType {
    pub fn new(params: Vec<SizedType>, return_type: Option<SizedType>) -> Self {
        Self {
            params,
            return_type: return_type.map(Box::new),
            is_foreign: false,
            is_variadic: false,
            size_in_bits: POINTER_BITS,
        }
    }

    pub fn foreign(mut self) -> Self {
        self.is_foreign = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }
}

/// A fully sized type as produced by semantic analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizedType {
    Direct(DirectType),
    Array(ArrayType),
    Function(FunctionType),
}

impl SizedType {
    pub fn direct(basic: BasicType) -> Self {
        SizedType::Direct(DirectType::new(basic))
    }

    pub fn size_in_bits(&self) -> u32 {
        match self {
            SizedType::Direct(t) => t.size_in_bits,
            SizedType::Array(t) => t.size_in_bits,
            SizedType::Function(t) => t.size_in_bits,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, SizedType::Function(_))
    }

    pub fn as_direct(&self) -> Option<&DirectType> {
        match self {
            SizedType::Direct(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for SizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizedType::Direct(t) => write!(f, "{}", t.basic.name()),
            SizedType::Array(t) => match t.count {
                Some(count) if !t.is_dynamic => write!(f, "[{}]{}", count, t.element),
                _ => write!(f, "[]{}", t.element),
            },
            SizedType::Function(t) => {
                if t.is_foreign {
                    write!(f, "foreign ")?;
                }
                write!(f, "fn(")?;
                for (i, param) in t.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                if t.is_variadic {
                    if !t.params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")?;
                if let Some(ret) = &t.return_type {
                    write!(f, " -> {}", ret)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sizes() {
        assert_eq!(BasicType::Bool.size_in_bits(), 8);
        assert_eq!(BasicType::S32.size_in_bits(), 32);
        assert_eq!(BasicType::F64.size_in_bits(), 64);
        assert_eq!(BasicType::String.size_in_bits(), 128);
    }

    #[test]
    fn test_array_sizes() {
        let fixed = ArrayType::fixed(SizedType::direct(BasicType::U8), 9).unwrap();
        assert_eq!(fixed.size_in_bits, 72);

        let largest = ArrayType::fixed(SizedType::direct(BasicType::U8), 536_870_911).unwrap();
        assert_eq!(largest.size_in_bits, u32::MAX - 7);

        let dynamic = ArrayType::dynamic(SizedType::direct(BasicType::S64));
        assert_eq!(dynamic.size_in_bits, 128);
    }

    #[test]
    fn test_oversized_fixed_array_is_rejected() {
        let err = ArrayType::fixed(SizedType::direct(BasicType::U8), 536_870_913).unwrap_err();
        assert_eq!(
            err,
            ArrayTooLarge {
                count: 536_870_913,
                element_bits: 8
            }
        );

        // multiply overflows u64 before the narrowing
        let err = ArrayType::fixed(SizedType::direct(BasicType::U64), 1 << 62).unwrap_err();
        assert_eq!(err.element_bits, 64);
    }

    #[test]
    fn test_function_type_is_pointer_sized() {
        let ty = FunctionType::new(vec![SizedType::direct(BasicType::String)], None).foreign();
        assert_eq!(ty.size_in_bits, 64);
        assert!(ty.is_foreign);
    }

    #[test]
    fn test_type_display() {
        let ty = SizedType::Array(ArrayType::fixed(SizedType::direct(BasicType::U16), 4).unwrap());
        assert_eq!(ty.to_string(), "[4]u16");

        let f = FunctionType::new(
            vec![SizedType::direct(BasicType::String)],
            Some(SizedType::direct(BasicType::S32)),
        )
        .variadic();
        assert_eq!(SizedType::Function(f).to_string(), "fn(string, ...) -> s32");
    }
}

/// Rank of a process taking part in one-sided communication (0-indexed).
pub type Rank = u32;

/// Element types understood by the transfer-type system.
///
/// Put and get move raw bytes (`U8`); accumulate moves typed elements so the
/// remote side can combine them with what is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    U8 = 0,
    I32 = 1,
    I64 = 2,
    F32 = 3,
    F64 = 4,
    /// Complex number made of two `f32` (re, im).
    C32 = 5,
    /// Complex number made of two `f64` (re, im).
    C64 = 6,
}

impl DataType {
    /// Size of one element in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I32 | DataType::F32 => 4,
            DataType::I64 | DataType::F64 | DataType::C32 => 8,
            DataType::C64 => 16,
        }
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::U8 => "u8",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::C32 => "c32",
            DataType::C64 => "c64",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical datatype tag of an accumulate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccType {
    Int,
    Long,
    Float,
    Double,
    Complex,
    DoubleComplex,
}

impl AccType {
    /// The element type an accumulate of this kind is built from.
    pub const fn element_type(self) -> DataType {
        match self {
            AccType::Int => DataType::I32,
            AccType::Long => DataType::I64,
            AccType::Float => DataType::F32,
            AccType::Double => DataType::F64,
            AccType::Complex => DataType::C32,
            AccType::DoubleComplex => DataType::C64,
        }
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            AccType::Int => "int",
            AccType::Long => "long",
            AccType::Float => "float",
            AccType::Double => "double",
            AccType::Complex => "complex",
            AccType::DoubleComplex => "double complex",
        }
    }
}

impl std::fmt::Display for AccType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Scale factor applied to incoming data by accumulate: `dst += scale * src`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccScale {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Complex(f32, f32),
    DoubleComplex(f64, f64),
}

impl AccScale {
    /// The accumulate tag this scale value belongs to.
    pub const fn acc_type(&self) -> AccType {
        match self {
            AccScale::Int(_) => AccType::Int,
            AccScale::Long(_) => AccType::Long,
            AccScale::Float(_) => AccType::Float,
            AccScale::Double(_) => AccType::Double,
            AccScale::Complex(..) => AccType::Complex,
            AccScale::DoubleComplex(..) => AccType::DoubleComplex,
        }
    }

    /// The multiplicative identity for `acc`, i.e. a plain sum.
    pub const fn one(acc: AccType) -> Self {
        match acc {
            AccType::Int => AccScale::Int(1),
            AccType::Long => AccScale::Long(1),
            AccType::Float => AccScale::Float(1.0),
            AccType::Double => AccScale::Double(1.0),
            AccType::Complex => AccScale::Complex(1.0, 0.0),
            AccType::DoubleComplex => AccScale::DoubleComplex(1.0, 0.0),
        }
    }
}

//! Element-wise scaled accumulate on byte slices: `dst[i] += scale * src[i]`.

use crate::error::{Result, StrataError};
use crate::types::AccScale;

/// Read/write a value from a little-endian byte slice (alignment-safe).
trait LeBytes: Sized + Copy {
    const SIZE: usize;
    fn read_le(bytes: &[u8]) -> Self;
    fn write_le(self, bytes: &mut [u8]);
}

macro_rules! impl_le_bytes {
    ($($ty:ty),*) => {
        $(
            impl LeBytes for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();
                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    Self::from_le_bytes(raw)
                }
                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_le_bytes!(i32, i64, f32, f64);

/// Types that support `a + scale * b`.
trait ScaledAdd: LeBytes {
    fn scaled_add(a: Self, b: Self, scale: Self) -> Self;
}

impl ScaledAdd for i32 {
    #[inline]
    fn scaled_add(a: Self, b: Self, scale: Self) -> Self {
        a.wrapping_add(scale.wrapping_mul(b))
    }
}

impl ScaledAdd for i64 {
    #[inline]
    fn scaled_add(a: Self, b: Self, scale: Self) -> Self {
        a.wrapping_add(scale.wrapping_mul(b))
    }
}

macro_rules! impl_scaled_add_float {
    ($($ty:ty),*) => {
        $(
            impl ScaledAdd for $ty {
                #[inline]
                fn scaled_add(a: Self, b: Self, scale: Self) -> Self {
                    a + scale * b
                }
            }
        )*
    };
}

impl_scaled_add_float!(f32, f64);

/// Complex number stored as `(re, im)` pairs of `T`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Complex<T>(T, T);

macro_rules! impl_complex {
    ($($ty:ty),*) => {
        $(
            impl LeBytes for Complex<$ty> {
                const SIZE: usize = 2 * std::mem::size_of::<$ty>();
                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let half = <$ty as LeBytes>::SIZE;
                    Complex(
                        <$ty>::read_le(&bytes[..half]),
                        <$ty>::read_le(&bytes[half..]),
                    )
                }
                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    let half = <$ty as LeBytes>::SIZE;
                    self.0.write_le(&mut bytes[..half]);
                    self.1.write_le(&mut bytes[half..]);
                }
            }

            impl ScaledAdd for Complex<$ty> {
                #[inline]
                fn scaled_add(a: Self, b: Self, s: Self) -> Self {
                    Complex(a.0 + s.0 * b.0 - s.1 * b.1, a.1 + s.0 * b.1 + s.1 * b.0)
                }
            }
        )*
    };
}

impl_complex!(f32, f64);

/// Element-wise `dst += scale * src`, elements typed by the scale.
///
/// Both slices must have the same length, a multiple of the element size.
pub(crate) fn scaled_accumulate(dst: &mut [u8], src: &[u8], scale: AccScale) -> Result<()> {
    if dst.len() != src.len() {
        return Err(StrataError::InvalidType(format!(
            "accumulate payloads differ: dst={} bytes, src={} bytes",
            dst.len(),
            src.len()
        )));
    }
    let es = scale.acc_type().element_type().size_in_bytes();
    if src.len() % es != 0 {
        return Err(StrataError::not_multiple("accumulate payload", src.len(), es));
    }

    match scale {
        AccScale::Int(s) => accumulate_typed(dst, src, s),
        AccScale::Long(s) => accumulate_typed(dst, src, s),
        AccScale::Float(s) => accumulate_typed(dst, src, s),
        AccScale::Double(s) => accumulate_typed(dst, src, s),
        AccScale::Complex(re, im) => accumulate_typed(dst, src, Complex(re, im)),
        AccScale::DoubleComplex(re, im) => accumulate_typed(dst, src, Complex(re, im)),
    }
    Ok(())
}

fn accumulate_typed<T: ScaledAdd>(dst: &mut [u8], src: &[u8], scale: T) {
    for (d, s) in dst.chunks_exact_mut(T::SIZE).zip(src.chunks_exact(T::SIZE)) {
        let r = T::scaled_add(T::read_le(d), T::read_le(s), scale);
        r.write_le(d);
    }
}

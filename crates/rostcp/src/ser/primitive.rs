// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size primitive kinds accepted by [`WireSerializer::write`](super::WireSerializer::write).

/// A fixed-size value with a little-endian wire representation.
///
/// `SIZE` doubles as the CDR alignment of the type. One-byte kinds
/// (`u8`, `i8`, `bool`) are never padded.
pub trait Primitive: Copy {
    /// Encoded size in bytes (also the CDR alignment).
    const SIZE: usize;

    /// Append the little-endian bytes of `self` to `out`.
    fn put_le(self, out: &mut Vec<u8>);
}

/// Generate `Primitive` impls for numeric types (eliminates code duplication)
///
/// Each generated impl:
/// 1. Uses `size_of` as both encoded size and alignment
/// 2. Converts value to little-endian bytes via `to_le_bytes()`
macro_rules! impl_primitive_le {
    ($($type:ty),* $(,)?) => {
        $(
            impl Primitive for $type {
                const SIZE: usize = std::mem::size_of::<$type>();

                #[inline]
                fn put_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_primitive_le!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Primitive for bool {
    const SIZE: usize = 1;

    #[inline]
    fn put_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

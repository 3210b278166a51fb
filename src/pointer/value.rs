// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size byte codec for values stored in external memory.
//!
//! Only types with a fixed external size can be placed behind an
//! [`ExternalPtr`](super::ExternalPtr); the trait bound is the shape check.

use crate::address::Address;

/// A value with a fixed-size little-endian external representation.
pub trait ExternalValue: Sized + Send + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Write the value into `out`, which is exactly `SIZE` bytes long.
    fn encode(&self, out: &mut [u8]);

    /// Read a value from `bytes`, which is exactly `SIZE` bytes long.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_le_bytes {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ExternalValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_le_bytes!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl ExternalValue for bool {
    const SIZE: usize = 1;

    fn encode(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl ExternalValue for Address {
    const SIZE: usize = 4;

    fn encode(&self, out: &mut [u8]) {
        self.value().encode(out);
    }

    fn decode(bytes: &[u8]) -> Self {
        Address::new(u32::decode(bytes))
    }
}

impl<T: ExternalValue, const N: usize> ExternalValue for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn encode(&self, out: &mut [u8]) {
        for (item, chunk) in self.iter().zip(out.chunks_exact_mut(T::SIZE.max(1))) {
            item.encode(chunk);
        }
    }

    fn decode(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::decode(&bytes[i * T::SIZE..(i + 1) * T::SIZE]))
    }
}

macro_rules! impl_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ExternalValue),+> ExternalValue for ($($name,)+) {
            const SIZE: usize = 0 $(+ $name::SIZE)+;

            fn encode(&self, out: &mut [u8]) {
                let mut offset = 0;
                $(
                    self.$idx.encode(&mut out[offset..offset + $name::SIZE]);
                    offset += $name::SIZE;
                )+
                let _ = offset;
            }

            #[allow(non_snake_case)]
            fn decode(bytes: &[u8]) -> Self {
                let mut offset = 0;
                $(
                    let $name = $name::decode(&bytes[offset..offset + $name::SIZE]);
                    offset += $name::SIZE;
                )+
                let _ = offset;
                ($($name,)+)
            }
        }
    };
}

impl_tuple!(A: 0, B: 1);
impl_tuple!(A: 0, B: 1, C: 2);
impl_tuple!(A: 0, B: 1, C: 2, D: 3);

/// Encode `value` into a fresh buffer.
pub fn to_bytes<T: ExternalValue>(value: &T) -> Vec<u8> {
    let mut bytes = vec![0u8; T::SIZE];
    value.encode(&mut bytes);
    bytes
}

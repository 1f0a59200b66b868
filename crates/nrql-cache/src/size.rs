//! Approximate memory footprint of cached values
//!
//! Sizes are estimates used for memory accounting, not measurements. Scalars
//! have fixed sizes, strings and byte vectors pay a header plus their length,
//! and containers pay a header plus the estimate of everything they hold.
//!
//! Walking stops at [`MAX_DEPTH`]; a container nested deeper than that is
//! charged [`OPAQUE_SIZE`] instead of being visited. Owned Rust values cannot
//! form cycles, but this keeps the cost of an estimate bounded for
//! pathologically deep payloads and for user impls over shared pointers.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::Arc;

/// Deepest container level that is walked
pub const MAX_DEPTH: usize = 32;

/// Charge for values whose layout is unknown
pub const OPAQUE_SIZE: u64 = 64;

pub const NUMBER_SIZE: u64 = 8;
pub const BOOL_SIZE: u64 = 1;
pub const STRING_HEADER: u64 = 16;
pub const SEQUENCE_HEADER: u64 = 24;
pub const MAP_HEADER: u64 = 48;

/// Values that can report an approximate footprint in bytes.
///
/// Types that do not override [`EstimateSize::estimate_at_depth`] are charged
/// the conservative [`OPAQUE_SIZE`].
pub trait EstimateSize {
    /// Estimate this value when found `depth` containers below the root
    fn estimate_at_depth(&self, _depth: usize) -> u64 {
        OPAQUE_SIZE
    }

    /// Estimate this value as the root of a cached payload
    fn estimate_size(&self) -> u64 {
        self.estimate_at_depth(0)
    }
}

macro_rules! fixed_size {
    ($size:expr => $($ty:ty),+) => {
        $(
            impl EstimateSize for $ty {
                fn estimate_at_depth(&self, _depth: usize) -> u64 {
                    $size
                }
            }
        )+
    };
}

fixed_size!(NUMBER_SIZE => i16, i32, i64, i128, isize, u16, u32, u64, u128, usize, f64);
fixed_size!(4 => f32, char);
fixed_size!(1 => i8, u8);
fixed_size!(BOOL_SIZE => bool);
fixed_size!(0 => ());

impl EstimateSize for str {
    fn estimate_at_depth(&self, _depth: usize) -> u64 {
        STRING_HEADER + self.len() as u64
    }
}

impl EstimateSize for String {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        self.as_str().estimate_at_depth(depth)
    }
}

impl<T: EstimateSize> EstimateSize for Option<T> {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        match self {
            Some(value) => value.estimate_at_depth(depth),
            None => 0,
        }
    }
}

impl<T: EstimateSize + ?Sized> EstimateSize for Box<T> {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        (**self).estimate_at_depth(depth)
    }
}

impl<T: EstimateSize + ?Sized> EstimateSize for Arc<T> {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        (**self).estimate_at_depth(depth)
    }
}

impl<T: EstimateSize> EstimateSize for [T] {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        if depth >= MAX_DEPTH {
            return OPAQUE_SIZE;
        }
        SEQUENCE_HEADER
            + self
                .iter()
                .map(|item| item.estimate_at_depth(depth + 1))
                .sum::<u64>()
    }
}

impl<T: EstimateSize> EstimateSize for Vec<T> {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        self.as_slice().estimate_at_depth(depth)
    }
}

fn estimate_pairs<'a, K, V, I>(pairs: I, depth: usize) -> u64
where
    K: EstimateSize + 'a,
    V: EstimateSize + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    if depth >= MAX_DEPTH {
        return OPAQUE_SIZE;
    }
    MAP_HEADER
        + pairs
            .map(|(k, v)| k.estimate_at_depth(depth + 1) + v.estimate_at_depth(depth + 1))
            .sum::<u64>()
}

impl<K: EstimateSize, V: EstimateSize, S: BuildHasher> EstimateSize for HashMap<K, V, S> {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        estimate_pairs(self.iter(), depth)
    }
}

impl<K: EstimateSize, V: EstimateSize> EstimateSize for BTreeMap<K, V> {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        estimate_pairs(self.iter(), depth)
    }
}

impl EstimateSize for Value {
    fn estimate_at_depth(&self, depth: usize) -> u64 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => BOOL_SIZE,
            Value::Number(_) => NUMBER_SIZE,
            Value::String(s) => s.estimate_at_depth(depth),
            Value::Array(items) => items.estimate_at_depth(depth),
            Value::Object(map) => {
                if depth >= MAX_DEPTH {
                    return OPAQUE_SIZE;
                }
                MAP_HEADER
                    + map
                        .iter()
                        .map(|(k, v)| {
                            k.estimate_at_depth(depth + 1) + v.estimate_at_depth(depth + 1)
                        })
                        .sum::<u64>()
            }
        }
    }
}

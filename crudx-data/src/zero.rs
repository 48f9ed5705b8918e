use std::rc::Rc;
use std::sync::Arc;

/// Zero-value inspection used to decide whether a key is worth looking up.
///
/// Two questions are answered:
///
/// - [`is_zero`](ZeroValue::is_zero): is the whole value equal to its type's
///   zero value (`0`, `""`, `None`, ...)? For structs this means *every* field
///   is zero.
/// - [`contains_zero`](ZeroValue::contains_zero): should the value be treated
///   as absent? For structs this means *any* field is zero. The check is
///   shallow: a nested struct field counts as zero only when all of its own
///   fields are zero, and an `Option` field counts as zero only when it is
///   `None`, whatever it wraps.
///
/// Implement it with `#[derive(ZeroValue)]` for key structs:
///
/// ```ignore
/// #[derive(ZeroValue)]
/// struct OrderLineKey {
///     order_id: i64,
///     line: i32,
/// }
///
/// assert!(OrderLineKey { order_id: 7, line: 0 }.contains_zero());
/// assert!(!OrderLineKey { order_id: 7, line: 0 }.is_zero());
/// ```
pub trait ZeroValue {
    fn is_zero(&self) -> bool;

    fn contains_zero(&self) -> bool {
        self.is_zero()
    }
}

/// Returns `true` when `value` should be treated as absent.
pub fn contains_zero_values<V: ZeroValue + ?Sized>(value: &V) -> bool {
    value.contains_zero()
}

/// Negation of [`contains_zero_values`].
pub fn not_contain_zero_values<V: ZeroValue + ?Sized>(value: &V) -> bool {
    !value.contains_zero()
}

macro_rules! impl_zero_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ZeroValue for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty as Default>::default()
                }
            }
        )*
    };
}

impl_zero_default!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char,
);

// Floats compare by bit pattern: `-0.0` and NaN are not the zero value.
macro_rules! impl_zero_float {
    ($($ty:ty),*) => {
        $(
            impl ZeroValue for $ty {
                fn is_zero(&self) -> bool {
                    self.to_bits() == 0
                }
            }
        )*
    };
}

impl_zero_float!(f32, f64);

impl ZeroValue for str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl ZeroValue for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl ZeroValue for () {
    fn is_zero(&self) -> bool {
        true
    }
}

impl<T: ZeroValue + ?Sized> ZeroValue for &T {
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn contains_zero(&self) -> bool {
        (**self).contains_zero()
    }
}

// Optional values behave like nullable pointers: only `None` is zero.
impl<T> ZeroValue for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T> ZeroValue for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

// Owning pointers are never null.
impl<T: ?Sized> ZeroValue for Box<T> {
    fn is_zero(&self) -> bool {
        false
    }
}

impl<T: ?Sized> ZeroValue for Rc<T> {
    fn is_zero(&self) -> bool {
        false
    }
}

impl<T: ?Sized> ZeroValue for Arc<T> {
    fn is_zero(&self) -> bool {
        false
    }
}

impl<T: ZeroValue, const N: usize> ZeroValue for [T; N] {
    fn is_zero(&self) -> bool {
        self.iter().all(ZeroValue::is_zero)
    }
}

macro_rules! impl_zero_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ZeroValue),+> ZeroValue for ($($name,)+) {
            fn is_zero(&self) -> bool {
                true $(&& self.$idx.is_zero())+
            }

            fn contains_zero(&self) -> bool {
                false $(|| self.$idx.is_zero())+
            }
        }
    };
}

impl_zero_tuple!(A: 0);
impl_zero_tuple!(A: 0, B: 1);
impl_zero_tuple!(A: 0, B: 1, C: 2);
impl_zero_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_zero_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_zero_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

#[cfg(feature = "uuid")]
impl ZeroValue for uuid::Uuid {
    fn is_zero(&self) -> bool {
        self.is_nil()
    }
}

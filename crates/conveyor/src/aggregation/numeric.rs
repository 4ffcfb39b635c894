//! Numeric coercion shared by the sum kernels
//!
//! Every integer and float width converts to `f64`. Values with no numeric
//! reading (strings, `None`, JSON non-numbers) yield `None` and are skipped
//! by the callers.

/// A value that may be read as an `f64`
pub trait Numeric {
    fn to_f64(&self) -> Option<f64>;
}

macro_rules! numeric_as_f64 {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Numeric for $ty {
                fn to_f64(&self) -> Option<f64> {
                    Some(*self as f64)
                }
            }
        )*
    };
}

numeric_as_f64!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl Numeric for serde_json::Value {
    fn to_f64(&self) -> Option<f64> {
        self.as_f64()
    }
}

impl Numeric for String {
    fn to_f64(&self) -> Option<f64> {
        None
    }
}

impl Numeric for &str {
    fn to_f64(&self) -> Option<f64> {
        None
    }
}

impl Numeric for bool {
    fn to_f64(&self) -> Option<f64> {
        None
    }
}

impl<N: Numeric> Numeric for Option<N> {
    fn to_f64(&self) -> Option<f64> {
        self.as_ref().and_then(Numeric::to_f64)
    }
}

impl<N: Numeric + ?Sized> Numeric for Box<N> {
    fn to_f64(&self) -> Option<f64> {
        (**self).to_f64()
    }
}

use std::fmt;

// Element — Traits that connect Rust numeric types to the array code
//
// The sampler is written once, generically, and instantiated at f32, f64 or
// f16 depending on the feature map's element type. The neighborhood cache
// stores i32 corner indices through the same array type, so the base trait
// covers integers too while the floating-point kernels bound on
// FloatElement (which pulls in num_traits::Float for floor/ceil/abs).

/// Trait implemented by Rust types that can be stored in an [`NdArray`].
///
/// [`NdArray`]: crate::NdArray
pub trait Element: Copy + Send + Sync + fmt::Debug + 'static {
    /// The zero value (used for buffer clearing and accumulation).
    const ZERO: Self;
    /// The one value.
    const ONE: Self;

    /// Convert this value to f64 (for inspection and numeric checks).
    fn to_f64(self) -> f64;

    /// Create a value of this type from f64.
    fn from_f64(v: f64) -> Self;
}

/// Floating-point elements the sampler kernels can operate on.
///
/// `num_traits::Float` supplies floor/ceil/abs and full arithmetic; the
/// blanket impl picks up every `Element` that is also a float.
pub trait FloatElement: Element + num_traits::Float {}

impl<T: Element + num_traits::Float> FloatElement for T {}

impl Element for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Element for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Element for half::f16 {
    const ZERO: Self = half::f16::ZERO;
    const ONE: Self = half::f16::ONE;
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }
}

impl Element for i32 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as i32
    }
}

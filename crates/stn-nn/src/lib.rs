//! # stn-nn
//!
//! A differentiable affine spatial warping layer.
//!
//! Given a batch of feature maps `[N, C, H, W]` and a per-sample 2x3 affine
//! transform `theta [N, 6]`, the layer resamples each map by bilinear
//! interpolation at affine-transformed coordinates and computes exact
//! gradients of a downstream scalar loss with respect to both the input map
//! and the affine parameters.
//!
//! The pieces, leaf-first:
//!
//! 1. [`TargetGrid`] — fixed normalized coordinate lattice of the output
//!    resolution, plus the affine mapping into source pixel space and the
//!    adjoint reduction back into the 6 theta parameters
//! 2. [`sampler`] — the bilinear forward/backward kernels for one sample
//! 3. [`SpatialTransformer`] — the layer: configure / forward / backward,
//!    owning the scratch buffers the two passes share
//! 4. [`GradientChecker`] — numeric finite-difference validation of the
//!    analytic gradients
//!
//! # Example
//! ```ignore
//! let mut layer = SpatialTransformer::<f64>::new();
//! layer.configure(input.shape(), theta.shape())?;
//! let output = layer.forward(&input, &theta)?;
//! let (input_grad, theta_grad) = layer.backward(&input, &output_grad)?;
//! ```

pub mod gradcheck;
pub mod grid;
pub mod sampler;
pub mod spatial_transformer;

pub use gradcheck::GradientChecker;
pub use grid::TargetGrid;
pub use sampler::OUT_OF_RANGE;
pub use spatial_transformer::SpatialTransformer;

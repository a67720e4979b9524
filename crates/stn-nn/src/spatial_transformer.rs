use stn_core::{Error, FloatElement, NdArray, Result, Shape};

use crate::grid::TargetGrid;
use crate::sampler::{self, OUT_OF_RANGE};

// SpatialTransformer — the layer tying grid, sampler and reduction together
//
// Control flow per batch element n:
//
//   forward:   theta[n] --grid--> source coords --sampler--> output planes
//   backward:  output grad --sampler--> input grad + coord grad
//                                        --grid^T--> theta grad
//
// The layer has exactly two states: Unconfigured and Configured. configure()
// validates shapes, then builds the target grid and every scratch buffer
// from scratch; a shape change means calling configure() again (no partial
// reuse). forward() rewrites the source coordinates and the neighborhood
// cache wholesale, so nothing needs manual resetting between unrelated
// batches. backward() reads those buffers, which is why it must be paired
// with the forward call that produced them; that pairing is a documented
// caller obligation, not something the layer can check.
//
// Batch elements are independent: every scratch buffer is indexed by n with
// disjoint per-sample regions, so a parallel execution strategy could split
// over n without any redesign here.

/// Buffers and dimensions of a configured layer.
#[derive(Debug)]
struct Configured<T: FloatElement> {
    num: usize,
    channels: usize,
    height: usize,
    width: usize,
    map_size: usize,
    grid: TargetGrid<T>,
    /// Source pixel coordinates, [N, 2, H, W]. Rewritten every forward.
    source: NdArray<T>,
    /// Per-pixel coordinate gradients, [N, 2, H, W]. Rewritten every backward.
    source_grad: NdArray<T>,
    /// Neighborhood origins (w_min, h_min) or the sentinel, [N, H, W, 2].
    corners: NdArray<i32>,
}

/// Differentiable affine warping layer.
///
/// Resamples `[N, C, H, W]` feature maps at coordinates produced by a
/// per-sample 2x3 affine transform, by bilinear interpolation, and computes
/// exact gradients for both inputs. See the crate docs for the full
/// contract.
#[derive(Debug)]
pub struct SpatialTransformer<T: FloatElement> {
    state: Option<Configured<T>>,
}

impl<T: FloatElement> Default for SpatialTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FloatElement> SpatialTransformer<T> {
    /// Create an unconfigured layer.
    pub fn new() -> Self {
        SpatialTransformer { state: None }
    }

    /// Whether [`configure`](Self::configure) has succeeded.
    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    /// Validate shapes and (re)build the target grid and scratch buffers.
    ///
    /// Requirements: `input_shape` is `[N, C, H, W]` with `H*W >= 4` (a 2x2
    /// neighborhood must exist), `theta_shape` is `[N, 6]` with matching
    /// batch size. All validation happens before any allocation, so a
    /// failed call leaves the previous state untouched.
    pub fn configure(&mut self, input_shape: &Shape, theta_shape: &Shape) -> Result<()> {
        if input_shape.rank() != 4 {
            return Err(Error::config(format!(
                "input must be 4D [N, C, H, W], got {}",
                input_shape
            )));
        }
        if theta_shape.rank() != 2 {
            return Err(Error::config(format!(
                "theta must be 2D [N, 6], got {}",
                theta_shape
            )));
        }
        let dims = input_shape.dims();
        let (num, channels, height, width) = (dims[0], dims[1], dims[2], dims[3]);
        if theta_shape.dims()[1] != 6 {
            return Err(Error::config(format!(
                "theta must hold 6 parameters per sample, got {}",
                theta_shape.dims()[1]
            )));
        }
        if theta_shape.dims()[0] != num {
            return Err(Error::config(format!(
                "batch mismatch: input has {} samples, theta has {}",
                num,
                theta_shape.dims()[0]
            )));
        }
        if height * width < 4 {
            return Err(Error::config(format!(
                "spatial size {}x{} too small, need H*W >= 4",
                height, width
            )));
        }

        self.state = Some(Configured {
            num,
            channels,
            height,
            width,
            map_size: height * width,
            grid: TargetGrid::build(height, width),
            source: NdArray::zeros(Shape::from((num, 2, height, width))),
            source_grad: NdArray::zeros(Shape::from((num, 2, height, width))),
            corners: NdArray::full(Shape::from((num, height, width, 2)), OUT_OF_RANGE),
        });
        Ok(())
    }

    /// Resample `input` at the coordinates given by `theta`.
    ///
    /// Returns a fresh `[N, C, H, W]` array. Out-of-range pixels are zero.
    /// Side effect: the internal source coordinates and neighborhood cache
    /// are rewritten in full (they are what the paired backward consumes).
    pub fn forward(&mut self, input: &NdArray<T>, theta: &NdArray<T>) -> Result<NdArray<T>> {
        let st = self.state.as_mut().ok_or_else(|| {
            Error::config("forward called on an unconfigured layer".to_string())
        })?;
        check_shape(input, &[st.num, st.channels, st.height, st.width])?;
        check_shape(theta, &[st.num, 6])?;

        let mut output = NdArray::<T>::zeros(input.shape().clone());
        // Stale cache entries from a previous forward must never leak into
        // the next backward, so the whole cache resets first.
        st.corners.fill(OUT_OF_RANGE);

        let sample_len = st.channels * st.map_size;
        let coord_len = 2 * st.map_size;
        for n in 0..st.num {
            let coords = &mut st.source.as_mut_slice()[n * coord_len..(n + 1) * coord_len];
            st.grid
                .source_coords(&theta.as_slice()[n * 6..(n + 1) * 6], coords)?;
            sampler::forward_sample(
                &input.as_slice()[n * sample_len..(n + 1) * sample_len],
                coords,
                st.channels,
                st.height,
                st.width,
                &mut output.as_mut_slice()[n * sample_len..(n + 1) * sample_len],
                &mut st.corners.as_mut_slice()[n * coord_len..(n + 1) * coord_len],
            );
        }
        Ok(output)
    }

    /// Propagate `output_grad` back to the input map and theta.
    ///
    /// `input` must be the same array the paired [`forward`](Self::forward)
    /// call saw: backward reads the coordinates and neighborhood cache that
    /// forward left behind, and the coordinate gradients depend on the
    /// input values themselves. Returns `(input_grad, theta_grad)`; theta
    /// itself is never updated by this layer.
    pub fn backward(
        &mut self,
        input: &NdArray<T>,
        output_grad: &NdArray<T>,
    ) -> Result<(NdArray<T>, NdArray<T>)> {
        let st = self.state.as_mut().ok_or_else(|| {
            Error::config("backward called on an unconfigured layer".to_string())
        })?;
        check_shape(input, &[st.num, st.channels, st.height, st.width])?;
        check_shape(output_grad, &[st.num, st.channels, st.height, st.width])?;

        let mut input_grad = NdArray::<T>::zeros(input.shape().clone());
        let mut theta_grad = NdArray::<T>::zeros(Shape::from((st.num, 6)));

        let sample_len = st.channels * st.map_size;
        let coord_len = 2 * st.map_size;
        for n in 0..st.num {
            let coord_grad =
                &mut st.source_grad.as_mut_slice()[n * coord_len..(n + 1) * coord_len];
            sampler::backward_sample(
                &input.as_slice()[n * sample_len..(n + 1) * sample_len],
                &st.source.as_slice()[n * coord_len..(n + 1) * coord_len],
                &st.corners.as_slice()[n * coord_len..(n + 1) * coord_len],
                &output_grad.as_slice()[n * sample_len..(n + 1) * sample_len],
                st.channels,
                st.height,
                st.width,
                &mut input_grad.as_mut_slice()[n * sample_len..(n + 1) * sample_len],
                coord_grad,
            );
            st.grid.reduce_theta_grad(
                coord_grad,
                &mut theta_grad.as_mut_slice()[n * 6..(n + 1) * 6],
            )?;
        }
        Ok((input_grad, theta_grad))
    }

    /// The fixed normalized grid, once configured.
    pub fn target_grid(&self) -> Option<&TargetGrid<T>> {
        self.state.as_ref().map(|st| &st.grid)
    }

    /// The source coordinates of the most recent forward call, [N, 2, H, W].
    pub fn source_coords(&self) -> Option<&NdArray<T>> {
        self.state.as_ref().map(|st| &st.source)
    }

    /// The neighborhood cache of the most recent forward call, [N, H, W, 2].
    pub fn neighborhood_cache(&self) -> Option<&NdArray<i32>> {
        self.state.as_ref().map(|st| &st.corners)
    }
}

fn check_shape<T: stn_core::Element>(array: &NdArray<T>, expected: &[usize]) -> Result<()> {
    if array.dims() != expected {
        return Err(Error::ShapeMismatch {
            expected: Shape::from(expected),
            got: array.shape().clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_theta(num: usize) -> NdArray<f64> {
        let mut data = Vec::with_capacity(num * 6);
        for _ in 0..num {
            data.extend_from_slice(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        }
        NdArray::from_vec(data, (num, 6)).unwrap()
    }

    #[test]
    fn test_configure_rejects_small_spatial_size() {
        let mut layer = SpatialTransformer::<f64>::new();
        let err = layer
            .configure(&Shape::from((1, 1, 1, 3)), &Shape::from((1, 6)))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(!layer.is_configured());
    }

    #[test]
    fn test_configure_rejects_bad_theta() {
        let mut layer = SpatialTransformer::<f64>::new();
        assert!(layer
            .configure(&Shape::from((1, 1, 4, 4)), &Shape::from((1, 5)))
            .is_err());
        assert!(layer
            .configure(&Shape::from((2, 1, 4, 4)), &Shape::from((1, 6)))
            .is_err());
        assert!(!layer.is_configured());
    }

    #[test]
    fn test_failed_reconfigure_keeps_previous_state() {
        let mut layer = SpatialTransformer::<f64>::new();
        layer
            .configure(&Shape::from((1, 1, 4, 4)), &Shape::from((1, 6)))
            .unwrap();
        assert!(layer
            .configure(&Shape::from((1, 1, 1, 1)), &Shape::from((1, 6)))
            .is_err());
        // still usable with the old configuration
        let input = NdArray::<f64>::full((1, 1, 4, 4), 1.0);
        assert!(layer.forward(&input, &identity_theta(1)).is_ok());
    }

    #[test]
    fn test_forward_requires_configuration() {
        let mut layer = SpatialTransformer::<f64>::new();
        let input = NdArray::<f64>::zeros((1, 1, 2, 2));
        assert!(layer.forward(&input, &identity_theta(1)).is_err());
    }

    #[test]
    fn test_forward_rejects_shape_mismatch() {
        let mut layer = SpatialTransformer::<f64>::new();
        layer
            .configure(&Shape::from((1, 1, 4, 4)), &Shape::from((1, 6)))
            .unwrap();
        let wrong = NdArray::<f64>::zeros((1, 2, 4, 4));
        assert!(layer.forward(&wrong, &identity_theta(1)).is_err());
    }

    #[test]
    fn test_identity_on_2x2() {
        let mut layer = SpatialTransformer::<f64>::new();
        let input = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0], (1, 1, 2, 2)).unwrap();
        layer
            .configure(input.shape(), &Shape::from((1, 6)))
            .unwrap();
        let output = layer.forward(&input, &identity_theta(1)).unwrap();
        assert_eq!(output.to_f64_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_collapsed_theta_averages_neighborhood() {
        // theta = 0 maps every target to normalized (0, 0), pixel (0.5, 0.5)
        let mut layer = SpatialTransformer::<f64>::new();
        let input = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0], (1, 1, 2, 2)).unwrap();
        layer
            .configure(input.shape(), &Shape::from((1, 6)))
            .unwrap();
        let theta = NdArray::<f64>::zeros((1, 6));
        let output = layer.forward(&input, &theta).unwrap();
        for v in output.to_f64_vec() {
            assert!((v - 2.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_half_scale_zoom_on_2x2() {
        let mut layer = SpatialTransformer::<f64>::new();
        let input = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0], (1, 1, 2, 2)).unwrap();
        layer
            .configure(input.shape(), &Shape::from((1, 6)))
            .unwrap();
        let theta = NdArray::from_vec(vec![0.5, 0.0, 0.0, 0.0, 0.5, 0.0], (1, 6)).unwrap();
        let output = layer.forward(&input, &theta).unwrap();
        let expected = [1.75, 2.25, 2.75, 3.25];
        for (got, exp) in output.to_f64_vec().iter().zip(expected.iter()) {
            assert!((got - exp).abs() < 1e-12);
        }
    }

    #[test]
    fn test_forward_in_f32() {
        let mut layer = SpatialTransformer::<f32>::new();
        let input = NdArray::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], (1, 1, 2, 2)).unwrap();
        layer
            .configure(input.shape(), &Shape::from((1, 6)))
            .unwrap();
        let theta = NdArray::from_vec(vec![1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0], (1, 6)).unwrap();
        let output = layer.forward(&input, &theta).unwrap();
        for (got, exp) in output.to_f64_vec().iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!((got - exp).abs() < 1e-5);
        }
    }
}

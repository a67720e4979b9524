use stn_core::{add_scalar, gemm, scale, FloatElement, NdArray, Result, Shape, Transpose};

// TargetGrid — the fixed normalized coordinate lattice
//
// For an output resolution H x W the grid holds homogeneous normalized
// coordinates (x, y, 1) for every output location:
//
//   x(w) = 2w/(W-1) - 1      y(h) = 2h/(H-1) - 1
//
// stored as a [1, 3, H, W] array: row 0 the x channel, row 1 the y channel,
// row 2 the constant 1. Flattened, that is exactly the 3 x (H*W) right-hand
// operand of the per-sample matrix product
//
//   source[n] (2 x HW) = theta[n] (2x3) @ grid (3 x HW)
//
// followed by de-normalization into pixel units. The same grid, transposed,
// contracts per-pixel coordinate gradients back into theta: the adjoint of
// the forward map. The grid is built once per configuration and shared
// read-only across samples and both passes.

/// Fixed normalized target coordinate grid for one output resolution.
#[derive(Debug, Clone)]
pub struct TargetGrid<T: FloatElement> {
    data: NdArray<T>,
    height: usize,
    width: usize,
}

impl<T: FloatElement> TargetGrid<T> {
    /// Build the grid for spatial dimensions `(height, width)`.
    pub fn build(height: usize, width: usize) -> Self {
        let mut data = NdArray::<T>::zeros(Shape::from((1, 3, height, width)));
        let map_size = height * width;
        {
            let buf = data.as_mut_slice();
            for h in 0..height {
                for w in 0..width {
                    let idx = h * width + w;
                    buf[idx] = T::from_f64(w as f64 / (width - 1) as f64 * 2.0 - 1.0);
                    buf[map_size + idx] = T::from_f64(h as f64 / (height - 1) as f64 * 2.0 - 1.0);
                    buf[2 * map_size + idx] = T::one();
                }
            }
        }
        TargetGrid {
            data,
            height,
            width,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of output pixels (H*W).
    pub fn map_size(&self) -> usize {
        self.height * self.width
    }

    /// The grid array, shape [1, 3, H, W].
    pub fn data(&self) -> &NdArray<T> {
        &self.data
    }

    /// Map one sample's theta into source pixel coordinates.
    ///
    /// `theta` is the sample's 6 parameters (row-major 2x3), `coords` the
    /// sample's 2*H*W output slice (x plane then y plane). After the matrix
    /// product the normalized result is rescaled in place into raw pixel
    /// units: x' = (x+1)(W-1)/2, y' = (y+1)(H-1)/2. No rounding happens
    /// here; the sampler consumes the continuous coordinates as-is.
    pub fn source_coords(&self, theta: &[T], coords: &mut [T]) -> Result<()> {
        let map_size = self.map_size();
        gemm(
            Transpose::No,
            Transpose::No,
            2,
            map_size,
            3,
            T::one(),
            theta,
            self.data.as_slice(),
            T::zero(),
            coords,
        )?;
        add_scalar(coords, T::one());
        let (xs, ys) = coords.split_at_mut(map_size);
        scale(xs, T::from_f64((self.width - 1) as f64 / 2.0));
        scale(ys, T::from_f64((self.height - 1) as f64 / 2.0));
        Ok(())
    }

    /// Contract one sample's per-pixel coordinate gradients into its 6
    /// theta gradients: `theta_grad (2x3) = coord_grad (2 x HW) @ grid^T`.
    ///
    /// The result is assigned, not accumulated; this layer's contribution
    /// replaces whatever was in `theta_grad`.
    pub fn reduce_theta_grad(&self, coord_grad: &[T], theta_grad: &mut [T]) -> Result<()> {
        gemm(
            Transpose::No,
            Transpose::Yes,
            2,
            3,
            self.map_size(),
            T::one(),
            coord_grad,
            self.data.as_slice(),
            T::zero(),
            theta_grad,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_channel_is_one() {
        let grid = TargetGrid::<f64>::build(4, 5);
        let map = grid.map_size();
        let buf = grid.data().as_slice();
        assert!(buf[2 * map..3 * map].iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_xy_channels_span_unit_interval() {
        let grid = TargetGrid::<f64>::build(3, 4);
        let map = grid.map_size();
        let buf = grid.data().as_slice();
        // x: first column -1, last column +1, monotone along w
        for h in 0..3 {
            assert_eq!(buf[h * 4], -1.0);
            assert_eq!(buf[h * 4 + 3], 1.0);
            for w in 1..4 {
                assert!(buf[h * 4 + w] > buf[h * 4 + w - 1]);
            }
        }
        // y: first row -1, last row +1, monotone along h
        for w in 0..4 {
            assert_eq!(buf[map + w], -1.0);
            assert_eq!(buf[map + 2 * 4 + w], 1.0);
            for h in 1..3 {
                assert!(buf[map + h * 4 + w] > buf[map + (h - 1) * 4 + w]);
            }
        }
    }

    #[test]
    fn test_identity_theta_yields_pixel_coords() {
        let grid = TargetGrid::<f64>::build(5, 5);
        let theta = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut coords = vec![0.0; 2 * grid.map_size()];
        grid.source_coords(&theta, &mut coords).unwrap();
        for h in 0..5 {
            for w in 0..5 {
                let idx = h * 5 + w;
                assert!((coords[idx] - w as f64).abs() < 1e-12);
                assert!((coords[25 + idx] - h as f64).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_denormalize_round_trip() {
        // de-normalize then re-normalize recovers the grid coordinate
        let grid = TargetGrid::<f64>::build(7, 9);
        let theta = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut coords = vec![0.0; 2 * grid.map_size()];
        grid.source_coords(&theta, &mut coords).unwrap();
        let buf = grid.data().as_slice();
        let map = grid.map_size();
        for idx in 0..map {
            let x_back = coords[idx] * 2.0 / 8.0 - 1.0;
            let y_back = coords[map + idx] * 2.0 / 6.0 - 1.0;
            assert!((x_back - buf[idx]).abs() < 1e-12);
            assert!((y_back - buf[map + idx]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reduce_theta_grad_all_ones() {
        // coord_grad of all ones contracts to row sums of the grid:
        // sum(x), sum(y), sum(1) for each of the two coordinate rows.
        let grid = TargetGrid::<f64>::build(3, 3);
        let map = grid.map_size();
        let coord_grad = vec![1.0; 2 * map];
        let mut theta_grad = [0.0f64; 6];
        grid.reduce_theta_grad(&coord_grad, &mut theta_grad).unwrap();
        // x and y channels are symmetric around zero, constant sums to 9
        for row in 0..2 {
            assert!((theta_grad[row * 3]).abs() < 1e-12);
            assert!((theta_grad[row * 3 + 1]).abs() < 1e-12);
            assert!((theta_grad[row * 3 + 2] - 9.0).abs() < 1e-12);
        }
    }
}

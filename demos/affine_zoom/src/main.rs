// affine_zoom — warp a ramp image with a rotation + zoom affine transform
//
// Builds a single-channel 8x8 diagonal ramp, runs the spatial transformer
// forward with a rotated half-zoom theta, then runs backward with an
// all-ones output gradient and prints the six theta gradients.

use stn_core::{NdArray, Result, Shape};
use stn_nn::SpatialTransformer;

/// Row-major 2x3 affine matrix from rotation (degrees), isotropic scale and
/// normalized translation.
fn make_theta(rotation_deg: f64, scale: f64, tx: f64, ty: f64) -> NdArray<f64> {
    let rad = rotation_deg.to_radians();
    let (sin, cos) = rad.sin_cos();
    NdArray::from_vec(
        vec![
            scale * cos,
            -scale * sin,
            tx,
            scale * sin,
            scale * cos,
            ty,
        ],
        (1, 6),
    )
    .expect("theta has 6 elements")
}

fn print_map(title: &str, data: &[f64], height: usize, width: usize) {
    println!("{title}:");
    for h in 0..height {
        let row: Vec<String> = (0..width)
            .map(|w| format!("{:5.1}", data[h * width + w]))
            .collect();
        println!("  {}", row.join(" "));
    }
}

fn main() -> Result<()> {
    let (height, width) = (8usize, 8usize);
    let ramp: Vec<f64> = (0..height * width)
        .map(|i| ((i / width) + (i % width)) as f64)
        .collect();
    let input = NdArray::from_vec(ramp, (1, 1, height, width))?;

    let mut layer = SpatialTransformer::<f64>::new();
    layer.configure(input.shape(), &Shape::from((1, 6)))?;

    let theta = make_theta(30.0, 0.5, 0.05, -0.05);
    let output = layer.forward(&input, &theta)?;

    print_map("input", &input.to_f64_vec(), height, width);
    print_map("warped (30 deg rotation, 2x zoom)", &output.to_f64_vec(), height, width);

    let ones = NdArray::<f64>::full((1, 1, height, width), 1.0);
    let (_, theta_grad) = layer.backward(&input, &ones)?;
    let g = theta_grad.to_f64_vec();
    println!("theta gradient (all-ones output gradient):");
    println!("  [{:8.3} {:8.3} {:8.3}]", g[0], g[1], g[2]);
    println!("  [{:8.3} {:8.3} {:8.3}]", g[3], g[4], g[5]);

    Ok(())
}

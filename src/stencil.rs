//! Kernel application over a block of rows.
//!
//! Window positions that fall outside the input rows are skipped rather than
//! padded, so image edges see a partial-window sum.

use crate::buffer::Pixel;
use crate::kernel::Kernel;
use crate::partition::WorkerPartition;

/// Convolve `out.len() / width` rows of `input`, starting at input row
/// `first_row`, into `out`.
///
/// `input` holds `height` rows of `width` pixels, halo rows included. Output
/// alpha is always 255.
pub fn apply_kernel(
    out: &mut [Pixel],
    input: &[Pixel],
    width: usize,
    height: usize,
    first_row: usize,
    kernel: &Kernel,
) {
    debug_assert_eq!(input.len(), width * height);
    if width == 0 {
        return;
    }
    debug_assert_eq!(out.len() % width, 0);

    let dim = kernel.dimension();
    let center = (dim / 2) as isize;
    let factor = kernel.factor();

    for (out_y, out_row) in out.chunks_exact_mut(width).enumerate() {
        let y = (first_row + out_y) as isize;
        for (x, px) in out_row.iter_mut().enumerate() {
            let x = x as isize;
            let (mut ar, mut ag, mut ab) = (0i64, 0i64, 0i64);
            for ky in 0..dim {
                let yy = y + ky as isize - center;
                if yy < 0 || yy >= height as isize {
                    continue;
                }
                let row = &input[yy as usize * width..(yy as usize + 1) * width];
                for kx in 0..dim {
                    let xx = x + kx as isize - center;
                    if xx < 0 || xx >= width as isize {
                        continue;
                    }
                    let c = kernel.mirrored(ky, kx) as i64;
                    let src = row[xx as usize];
                    ar += src.r as i64 * c;
                    ag += src.g as i64 * c;
                    ab += src.b as i64 * c;
                }
            }
            *px = finish(ar, ag, ab, factor);
        }
    }
}

/// Scale the channel sums and clamp them into a pixel.
///
/// When all three scaled sums truncate to zero the pixel is written as
/// opaque black explicitly, whatever the output buffer held before.
#[inline]
fn finish(ar: i64, ag: i64, ab: i64, factor: f32) -> Pixel {
    let scale = |acc: i64| (acc as f32 * factor) as i64;
    let (r, g, b) = (scale(ar), scale(ag), scale(ab));
    if r == 0 && g == 0 && b == 0 {
        return Pixel::BLACK;
    }
    let clamp = |v: i64| v.clamp(0, 255) as u8;
    Pixel::new(clamp(r), clamp(g), clamp(b), 255)
}

/// Write the owned rows of `next` from the rows (halos included) of `current`.
pub fn apply_partition(next: &mut WorkerPartition, current: &WorkerPartition, kernel: &Kernel) {
    debug_assert_eq!(next.total_rows(), current.total_rows());
    apply_kernel(
        next.own_pixels_mut(),
        current.pixels(),
        current.width(),
        current.total_rows(),
        current.leading_rows(),
        kernel,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelKind;

    fn run(input: &[Pixel], width: usize, height: usize, kernel: &Kernel) -> Vec<Pixel> {
        let mut out = vec![Pixel::default(); width * height];
        apply_kernel(&mut out, input, width, height, 0, kernel);
        out
    }

    #[test]
    fn identity_kernel_keeps_colour_and_forces_alpha() {
        let input: Vec<Pixel> = (0..12u8)
            .map(|i| Pixel::new(i * 20, 255 - i, i, i * 3))
            .collect();
        let out = run(&input, 4, 3, &Kernel::identity());
        for (o, i) in out.iter().zip(&input) {
            if i.r == 0 && i.g == 0 && i.b == 0 {
                assert_eq!(*o, Pixel::BLACK);
            } else {
                assert_eq!(*o, i.opaque());
            }
        }
    }

    #[test]
    fn flat_image_has_zero_interior_gradient() {
        let input = vec![Pixel::WHITE; 16];
        let out = run(&input, 4, 4, &KernelKind::SobelY.kernel());
        for y in 1..3 {
            for x in 0..4 {
                assert_eq!(out[y * 4 + x], Pixel::BLACK, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn edges_get_partial_window_sums() {
        // At the top edge only the row below contributes, weighted (-1, -2, -1),
        // so the sum is negative and clamps to 0. At the bottom edge only the
        // row above contributes, weighted (1, 2, 1).
        let input = vec![Pixel::new(10, 10, 10, 255); 9];
        let out = run(&input, 3, 3, &KernelKind::SobelY.kernel());
        assert_eq!(out[1], Pixel::BLACK);
        assert_eq!(out[7], Pixel::new(40, 40, 40, 255));
        assert_eq!(out[6], Pixel::new(30, 30, 30, 255));
    }

    #[test]
    fn convolution_mirrors_the_kernel() {
        // Single bright pixel in the centre picks up the mirrored coefficient.
        let mut input = vec![Pixel::new(0, 0, 0, 255); 9];
        input[4] = Pixel::new(1, 1, 1, 255);
        let k = Kernel::new("probe", 3, vec![1, 2, 3, 4, 5, 6, 7, 8, 9], 1.0).unwrap();
        let out = run(&input, 3, 3, &k);
        // out(0,0) reads input(1,1) at window (2,2) -> stored (0,0) = 1.
        assert_eq!(out[0].r, 1);
        // out(2,0) reads input(1,1) at window (2,0) -> stored (0,2) = 3.
        assert_eq!(out[2].r, 3);
        assert_eq!(out[6].r, 7);
        assert_eq!(out[8].r, 9);
    }

    #[test]
    fn zero_sum_overwrites_stale_output_with_black() {
        let input = vec![Pixel::new(50, 60, 70, 10); 9];
        let mut out = vec![Pixel::new(9, 9, 9, 9); 9];
        let laplacian = KernelKind::Laplacian2.kernel();
        apply_kernel(&mut out, &input, 3, 3, 0, &laplacian);
        assert_eq!(out[4], Pixel::BLACK);
    }

    #[test]
    fn factor_truncates_then_clamps() {
        let input = vec![Pixel::new(200, 100, 1, 255); 25];
        let out = run(&input, 5, 5, &KernelKind::Gaussian.kernel());
        // Full window at the centre: sum of weights is 256, factor 1/256.
        assert_eq!(out[12], Pixel::new(200, 100, 1, 255));
        let k = Kernel::new("bright", 1, vec![3], 1.0).unwrap();
        let out = run(&input[..1], 1, 1, &k);
        assert_eq!(out[0], Pixel::new(255, 255, 3, 255));
    }

    #[test]
    fn halo_rows_feed_but_are_not_written() {
        let width = 2;
        let mut current = WorkerPartition::new(width, 1, 2, 1).unwrap();
        current.leading_halo_mut().fill(Pixel::new(100, 0, 0, 255));
        current.own_pixels_mut().fill(Pixel::new(10, 0, 0, 255));
        let mut next = WorkerPartition::new(width, 1, 2, 1).unwrap();
        let sum_above = Kernel::new("above", 3, vec![0, 0, 0, 0, 0, 0, 0, 1, 0], 1.0).unwrap();
        apply_partition(&mut next, &current, &sum_above);
        // Stored (2,1) lands on window (0,1): output(y) = input(y - 1).
        assert_eq!(next.own_pixels()[0].r, 100);
        assert_eq!(next.own_pixels()[2].r, 10);
        assert!(next.leading_halo().iter().all(|p| *p == Pixel::default()));
    }
}

#![allow(dead_code)]

pub mod mpi_mock;

use distributed_image_convolution::{Image, Pixel};

/// Opaque test image whose channels vary along both axes
pub fn gradient(width: usize, height: usize) -> Image {
    let pixels = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                Pixel::new(
                    ((x * 40 + y * 10) % 256) as u8,
                    ((y * 30) % 256) as u8,
                    (((x + y) * 20) % 256) as u8,
                    255,
                )
            })
        })
        .collect();
    Image::from_pixels(pixels, width, height).unwrap()
}

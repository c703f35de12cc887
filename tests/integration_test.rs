mod common;

use common::gradient;
use distributed_image_convolution::codec::{load_image, save_image};
use distributed_image_convolution::coordinator::run_job_local;
use distributed_image_convolution::{
    convolve_local, ConvolveError, Image, JobConfig, KernelKind, Pixel, RunConfig,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_image_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("gradient.png");

    let original = gradient(9, 5);
    save_image(&original, &file_path).unwrap();
    let loaded = load_image(&file_path).unwrap();

    assert_eq!(loaded.width(), 9);
    assert_eq!(loaded.height(), 5);
    assert_eq!(loaded, original);
}

#[test]
fn test_top_row_stays_on_top() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("stripe.bmp");

    let mut image = Image::filled(3, 2, Pixel::BLACK).unwrap();
    for x in 0..3 {
        image.set(x, 0, Pixel::WHITE).unwrap();
    }
    save_image(&image, &file_path).unwrap();

    let decoded = image::open(&file_path).unwrap().into_rgba8();
    assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255, 255]);
    assert_eq!(decoded.get_pixel(1, 1).0, [0, 0, 0, 255]);
    assert_eq!(load_image(&file_path).unwrap(), image);
}

#[test]
fn test_job_writes_convolved_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.png");
    let output = temp_dir.path().join("out").join("result.png");

    let image = gradient(8, 10);
    save_image(&image, &input).unwrap();

    let run = RunConfig::new(KernelKind::Laplacian1.kernel(), 2);
    let job = JobConfig::new(input, output.clone(), run.clone()).unwrap();
    run_job_local(&job, 3).unwrap();

    assert!(output.exists());
    let written = load_image(&output).unwrap();
    assert_eq!(written, convolve_local(&image, &run, 1).unwrap());
}

#[test]
fn test_missing_input_is_a_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    let job = JobConfig::new(
        temp_dir.path().join("absent.png"),
        temp_dir.path().join("out.png"),
        RunConfig::from_catalog(0, 1).unwrap(),
    )
    .unwrap();

    let result = run_job_local(&job, 2);
    assert!(matches!(result, Err(ConvolveError::Decode(_))));
    assert!(!temp_dir.path().join("out.png").exists());
}

#[test]
fn test_garbage_input_is_a_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("noise.png");
    fs::write(&input, b"definitely not a png").unwrap();

    let result = load_image(&input);
    assert!(matches!(result, Err(ConvolveError::Decode(_))));
}

#[test]
fn test_unknown_output_extension_is_an_encode_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = save_image(&gradient(2, 2), &temp_dir.path().join("out.unknownext"));
    assert!(matches!(result, Err(ConvolveError::Encode(_))));
}

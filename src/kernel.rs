//! Convolution kernels and the fixed kernel catalog.

use crate::error::{ConvolveError, Result};
use std::borrow::Cow;

static SOBEL_Y: [i32; 9] = [
    -1, -2, -1, //
    0, 0, 0, //
    1, 2, 1,
];

static SOBEL_X: [i32; 9] = [
    -1, 0, 1, //
    -2, 0, 2, //
    -1, 0, 1,
];

static LAPLACIAN_1: [i32; 9] = [
    -1, -4, -1, //
    -4, 20, -4, //
    -1, -4, -1,
];

static LAPLACIAN_2: [i32; 9] = [
    0, 1, 0, //
    1, -4, 1, //
    0, 1, 0,
];

static LAPLACIAN_3: [i32; 9] = [
    -1, -1, -1, //
    -1, 8, -1, //
    -1, -1, -1,
];

static IDENTITY: [i32; 1] = [1];

static GAUSSIAN: [i32; 25] = [
    1, 4, 6, 4, 1, //
    4, 16, 24, 16, 4, //
    6, 24, 36, 24, 6, //
    4, 16, 24, 16, 4, //
    1, 4, 6, 4, 1,
];

/// Kernel used when no index is given.
pub const DEFAULT_KERNEL_INDEX: usize = 2;

/// Square convolution kernel with odd dimension.
///
/// Coefficients are stored row-major; evaluation mirrors them by 180°.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    name: Cow<'static, str>,
    dimension: usize,
    coefficients: Cow<'static, [i32]>,
    factor: f32,
}

impl Kernel {
    /// Build a kernel, checking that it is square with odd dimension.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        dimension: usize,
        coefficients: impl Into<Cow<'static, [i32]>>,
        factor: f32,
    ) -> Result<Self> {
        let coefficients = coefficients.into();
        if dimension == 0 || dimension % 2 == 0 {
            return Err(ConvolveError::Config(format!(
                "Kernel dimension must be odd, got {}",
                dimension
            )));
        }
        if coefficients.len() != dimension * dimension {
            return Err(ConvolveError::Config(format!(
                "Kernel of dimension {} needs {} coefficients, got {}",
                dimension,
                dimension * dimension,
                coefficients.len()
            )));
        }
        if !factor.is_finite() {
            return Err(ConvolveError::Config(format!(
                "Kernel factor must be finite, got {}",
                factor
            )));
        }
        Ok(Kernel {
            name: name.into(),
            dimension,
            coefficients,
            factor,
        })
    }

    /// 1x1 kernel that leaves colour channels untouched.
    pub fn identity() -> Self {
        Kernel {
            name: Cow::Borrowed("Identity"),
            dimension: 1,
            coefficients: Cow::Borrowed(&IDENTITY[..]),
            factor: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Rows of context needed on each side of a pixel.
    pub fn radius(&self) -> usize {
        (self.dimension - 1) / 2
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn coefficients(&self) -> &[i32] {
        &self.coefficients
    }

    /// Coefficient applied to window offset (`ky`, `kx`), i.e. the stored
    /// coefficient rotated by 180°.
    #[inline]
    pub fn mirrored(&self, ky: usize, kx: usize) -> i32 {
        let d = self.dimension;
        self.coefficients[(d - 1 - ky) * d + (d - 1 - kx)]
    }
}

/// The fixed kernel catalog, addressed by index on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    SobelY,
    SobelX,
    Laplacian1,
    Laplacian2,
    Laplacian3,
    Gaussian,
}

impl KernelKind {
    pub const ALL: [KernelKind; 6] = [
        KernelKind::SobelY,
        KernelKind::SobelX,
        KernelKind::Laplacian1,
        KernelKind::Laplacian2,
        KernelKind::Laplacian3,
        KernelKind::Gaussian,
    ];

    /// Look up a catalog entry, rejecting indices outside the catalog.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            ConvolveError::Config(format!(
                "Kernel index {} out of range (0..={})",
                index,
                Self::ALL.len() - 1
            ))
        })
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kernel(self) -> Kernel {
        let (name, dimension, coefficients, factor): (&'static str, usize, &'static [i32], f32) =
            match self {
                KernelKind::SobelY => ("SobelY", 3, &SOBEL_Y[..], 1.0),
                KernelKind::SobelX => ("SobelX", 3, &SOBEL_X[..], 1.0),
                KernelKind::Laplacian1 => ("Laplacian 1", 3, &LAPLACIAN_1[..], 1.0),
                KernelKind::Laplacian2 => ("Laplacian 2", 3, &LAPLACIAN_2[..], 1.0),
                KernelKind::Laplacian3 => ("Laplacian 3", 3, &LAPLACIAN_3[..], 1.0),
                KernelKind::Gaussian => ("Gaussian", 5, &GAUSSIAN[..], 1.0 / 256.0),
            };
        Kernel {
            name: Cow::Borrowed(name),
            dimension,
            coefficients: Cow::Borrowed(coefficients),
            factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indices_round_trip() {
        for (i, kind) in KernelKind::ALL.iter().enumerate() {
            assert_eq!(KernelKind::from_index(i).unwrap(), *kind);
            assert_eq!(kind.index(), i);
        }
        assert!(KernelKind::from_index(6).is_err());
    }

    #[test]
    fn catalog_kernels_are_consistent() {
        for kind in KernelKind::ALL {
            let k = kind.kernel();
            assert_eq!(k.coefficients().len(), k.dimension() * k.dimension());
            assert_eq!(k.dimension() % 2, 1);
        }
        let gaussian = KernelKind::Gaussian.kernel();
        assert_eq!(gaussian.radius(), 2);
        assert_eq!(gaussian.coefficients().iter().sum::<i32>(), 256);
    }

    #[test]
    fn mirrored_rotates_by_half_turn() {
        let k = KernelKind::SobelY.kernel();
        assert_eq!(k.mirrored(0, 0), 1);
        assert_eq!(k.mirrored(0, 1), 2);
        assert_eq!(k.mirrored(2, 1), -2);
        let x = KernelKind::SobelX.kernel();
        assert_eq!(x.mirrored(1, 0), 2);
    }

    #[test]
    fn rejects_even_or_mismatched_kernels() {
        assert!(Kernel::new("even", 2, vec![1, 1, 1, 1], 1.0).is_err());
        assert!(Kernel::new("short", 3, vec![1; 8], 1.0).is_err());
        assert!(Kernel::new("nan", 1, vec![1], f32::NAN).is_err());
        assert!(Kernel::new("ok", 3, vec![0; 9], 0.5).is_ok());
    }
}

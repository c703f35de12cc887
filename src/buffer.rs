use crate::error::{ConvolveError, Result};
use bytemuck::{Pod, Zeroable};

/// One RGBA pixel, 8 bits per channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Size of a pixel on the wire.
pub const PIXEL_BYTES: usize = std::mem::size_of::<Pixel>();

impl Pixel {
    pub const BLACK: Pixel = Pixel::new(0, 0, 0, 255);
    pub const WHITE: Pixel = Pixel::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Pixel { r, g, b, a }
    }

    /// Same colour with alpha forced to fully opaque.
    pub const fn opaque(self) -> Self {
        Pixel { a: 255, ..self }
    }
}

/// Allocate a zeroed pixel vector, reporting allocation failure instead of aborting.
pub(crate) fn alloc_pixels(len: usize) -> Result<Vec<Pixel>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        ConvolveError::Allocation(format!("{} pixels ({} bytes): {}", len, len * PIXEL_BYTES, e))
    })?;
    data.resize(len, Pixel::default());
    Ok(data)
}

/// Row-major RGBA image with a row-offset index over its buffer.
///
/// The index is rebuilt every time the buffer is (re)allocated, so row
/// access never goes through stale offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    data: Vec<Pixel>,
    row_offsets: Vec<usize>,
}

impl Image {
    /// Create a zeroed image with the given dimensions
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let data = alloc_pixels(width * height)?;
        Self::from_pixels(data, width, height)
    }

    /// Create an image from a vector of pixels
    pub fn from_pixels(data: Vec<Pixel>, width: usize, height: usize) -> Result<Self> {
        if data.len() != width * height {
            return Err(ConvolveError::Config(format!(
                "Pixel count {} does not match dimensions {}x{}",
                data.len(),
                width,
                height
            )));
        }
        let mut image = Image {
            width,
            height,
            data,
            row_offsets: Vec::new(),
        };
        image.reindex_rows();
        Ok(image)
    }

    /// Create an image from packed RGBA bytes (4 bytes per pixel, row-major)
    pub fn from_rgba_bytes(bytes: &[u8], width: usize, height: usize) -> Result<Self> {
        if bytes.len() != width * height * PIXEL_BYTES {
            return Err(ConvolveError::Config(format!(
                "Byte length {} does not match RGBA dimensions {}x{}",
                bytes.len(),
                width,
                height
            )));
        }
        let data: Vec<Pixel> = bytes
            .chunks_exact(PIXEL_BYTES)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect();
        Self::from_pixels(data, width, height)
    }

    /// Create an image where every pixel has the same value
    pub fn filled(width: usize, height: usize, pixel: Pixel) -> Result<Self> {
        let mut image = Self::new(width, height)?;
        image.data.fill(pixel);
        Ok(image)
    }

    fn reindex_rows(&mut self) {
        self.row_offsets.clear();
        self.row_offsets
            .extend((0..self.height).map(|row| row * self.width));
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.data
    }

    /// Byte view of the whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Get a pixel at a specific position
    pub fn get(&self, x: usize, y: usize) -> Result<Pixel> {
        if x >= self.width || y >= self.height {
            return Err(self.out_of_bounds(x, y));
        }
        Ok(self.data[self.row_offsets[y] + x])
    }

    /// Set a pixel at a specific position
    pub fn set(&mut self, x: usize, y: usize, pixel: Pixel) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(self.out_of_bounds(x, y));
        }
        let offset = self.row_offsets[y] + x;
        self.data[offset] = pixel;
        Ok(())
    }

    /// Get a row as a slice
    pub fn row(&self, y: usize) -> Result<&[Pixel]> {
        let start = *self.row_offsets.get(y).ok_or_else(|| {
            ConvolveError::Config(format!("Row index {} out of bounds for {} rows", y, self.height))
        })?;
        Ok(&self.data[start..start + self.width])
    }

    /// Contiguous block of `count` rows starting at `start`
    pub fn rows(&self, start: usize, count: usize) -> Result<&[Pixel]> {
        let range = self.row_range(start, count)?;
        Ok(&self.data[range])
    }

    fn row_range(&self, start: usize, count: usize) -> Result<std::ops::Range<usize>> {
        if start + count > self.height {
            return Err(ConvolveError::Config(format!(
                "Row block out of bounds: start={}, count={}, total_rows={}",
                start, count, self.height
            )));
        }
        if count == 0 {
            return Ok(0..0);
        }
        let begin = self.row_offsets[start];
        Ok(begin..begin + count * self.width)
    }

    /// Reallocate the buffer to `height` rows, keeping the overlapping rows.
    pub fn resize_rows(&mut self, height: usize) -> Result<()> {
        let mut data = alloc_pixels(self.width * height)?;
        let kept = self.width * height.min(self.height);
        data[..kept].copy_from_slice(&self.data[..kept]);
        self.data = data;
        self.height = height;
        self.reindex_rows();
        Ok(())
    }

    fn out_of_bounds(&self, x: usize, y: usize) -> ConvolveError {
        ConvolveError::Config(format!(
            "Pixel index out of bounds: ({}, {}) for image {}x{}",
            x, y, self.width, self.height
        ))
    }
}

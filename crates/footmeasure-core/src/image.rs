/// Borrowed single-channel 8-bit image.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl GrayImageView<'_> {
    /// Pixel at `(x, y)`, or 0 outside the image.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Mean of the 3×3 neighbourhood around the pixel containing `(x, y)`.
    ///
    /// Returns `None` when the neighbourhood leaves the image.
    pub fn mean_3x3(&self, x: f32, y: f32) -> Option<u8> {
        let ix = x.floor() as i32;
        let iy = y.floor() as i32;
        if ix < 1 || iy < 1 || ix + 1 >= self.width as i32 || iy + 1 >= self.height as i32 {
            return None;
        }

        let mut sum = 0u32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                sum += self.get(ix + dx, iy + dy) as u32;
            }
        }
        Some((sum / 9) as u8)
    }
}

/// Owned single-channel 8-bit image.
#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image of the given size filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }
}

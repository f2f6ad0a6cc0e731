use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T> Image<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, Error> {
        let expected = width.checked_mul(height).ok_or(Error::SizeMismatch {
            expected: usize::MAX,
            actual: data.len(),
        })?;

        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &self.data,
        }
    }
}

impl<T: Clone> Image<T> {
    pub fn new_fill(width: usize, height: usize, value: T) -> Self {
        let len = width.checked_mul(height).expect("image size overflow");
        Self {
            width,
            height,
            data: vec![value; len],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a [T],
}

impl<'a, T> ImageView<'a, T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, y: usize) -> &'a [T] {
        assert!(y < self.height, "row index out of bounds");
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y * self.stride + x;
        self.data.get(idx)
    }

    pub fn subview(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageView<'a, T>, Error> {
        if x > self.width
            || y > self.height
            || width > (self.width - x)
            || height > (self.height - y)
        {
            return Err(Error::OutOfBounds);
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(Error::OutOfBounds)?;
        let min_len = min_required_len(width, height, self.stride).ok_or(Error::OutOfBounds)?;
        let tail = self.data.get(start..).ok_or(Error::OutOfBounds)?;

        if tail.len() < min_len {
            return Err(Error::OutOfBounds);
        }

        Ok(ImageView {
            width,
            height,
            stride: self.stride,
            data: tail,
        })
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Gathers column `x` top-to-bottom into `out`, replacing its contents.
    pub fn column_into(&self, x: usize, out: &mut Vec<T>) {
        assert!(x < self.width, "column index out of bounds");
        out.clear();
        out.extend((0..self.height).map(|y| self.data[y * self.stride + x]));
    }
}

fn min_required_len(width: usize, height: usize, stride: usize) -> Option<usize> {
    if width == 0 || height == 0 {
        return Some(0);
    }

    let rows_before_last = height.checked_sub(1)?;
    let base = rows_before_last.checked_mul(stride)?;
    base.checked_add(width)
}

/// Interleaved sample layouts accepted from capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray,
    Rgb,
    Rgba,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    pub fn from_count(n: usize) -> Result<Self, Error> {
        match n {
            1 => Ok(Self::Gray),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            other => Err(Error::UnsupportedChannels(other)),
        }
    }
}

/// Raw 8-bit interleaved pixels as handed over by a capture source.
///
/// Invariant: `data.len() == width * height * channels` and both dimensions
/// are non-zero. A buffer is read-only for the duration of a measurement pass;
/// preprocessing produces new buffers instead of editing the capture in place.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    channels: Channels,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(
        width: usize,
        height: usize,
        channels: Channels,
        data: Vec<u8>,
    ) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels.count()))
            .ok_or(Error::SizeMismatch {
                expected: usize::MAX,
                actual: data.len(),
            })?;

        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn from_gray(image: Image<u8>) -> Result<Self, Error> {
        let (w, h) = (image.width(), image.height());
        Self::new(w, h, Channels::Gray, image.into_vec())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels(&self) -> core::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.channels.count())
    }

    pub fn pixels_mut(&mut self) -> core::slice::ChunksExactMut<'_, u8> {
        self.data.chunks_exact_mut(self.channels.count())
    }
}

#[cfg(test)]
mod tests {
    use super::{Channels, Image, PixelBuffer};
    use crate::Error;

    #[test]
    fn view_indexing() {
        let img = Image::from_vec(3, 2, vec![1u8, 2, 3, 4, 5, 6]).expect("valid image");
        let view = img.as_view();

        assert_eq!(view.row(0), &[1, 2, 3]);
        assert_eq!(view.row(1), &[4, 5, 6]);
        assert_eq!(view.get(0, 1), Some(&4));
        assert_eq!(view.get(2, 1), Some(&6));
        assert_eq!(view.get(3, 1), None);

        let mut col = Vec::new();
        view.column_into(1, &mut col);
        assert_eq!(col, vec![2, 5]);
    }

    #[test]
    fn subview_keeps_parent_stride() {
        let data = vec![
            10u8, 11, 12, 13, 14, // row 0
            20, 21, 22, 23, 24, // row 1
            30, 31, 32, 33, 34, // row 2
        ];
        let img = Image::from_vec(5, 3, data).expect("valid image");
        let parent = img.as_view();
        let sub = parent.subview(1, 1, 3, 2).expect("valid subview");

        assert_eq!(sub.width(), 3);
        assert_eq!(sub.height(), 2);
        assert_eq!(sub.row(0), &[21, 22, 23]);
        assert_eq!(sub.row(1), &[31, 32, 33]);
        assert_eq!(sub.get(2, 1), Some(&33));
        assert_eq!(sub.get(3, 0), None);

        let mut col = Vec::new();
        sub.column_into(2, &mut col);
        assert_eq!(col, vec![23, 33]);

        assert!(parent.subview(3, 2, 3, 1).is_err());
    }

    #[test]
    fn pixel_buffer_validates_layout() {
        assert_eq!(
            PixelBuffer::new(0, 4, Channels::Gray, Vec::new()),
            Err(Error::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
        assert_eq!(
            PixelBuffer::new(2, 2, Channels::Rgba, vec![0; 15]),
            Err(Error::SizeMismatch {
                expected: 16,
                actual: 15
            })
        );
        assert_eq!(Channels::from_count(2), Err(Error::UnsupportedChannels(2)));

        let buf = PixelBuffer::new(2, 1, Channels::Rgb, vec![1, 2, 3, 4, 5, 6]).expect("valid");
        assert_eq!(buf.pixels().count(), 2);
        assert_eq!(buf.pixels().nth(1), Some(&[4u8, 5, 6][..]));

        let gray = Image::from_vec(3, 1, vec![7u8, 8, 9]).expect("valid image");
        let buf = PixelBuffer::from_gray(gray).expect("valid gray buffer");
        assert_eq!(buf.channels(), Channels::Gray);
        assert_eq!(buf.pixels().last(), Some(&[9u8][..]));
        assert!(Image::from_vec(2, 2, vec![0u8; 3]).is_err());
    }
}

//! Sobel gradient field.
//!
//! `gx` uses `[[-1,0,1],[-2,0,2],[-1,0,1]]` and `gy` uses
//! `[[-1,-2,-1],[0,0,0],[1,2,1]]`, so `gy` is positive when intensity grows
//! downward. The outermost ring of pixels has no defined gradient: its
//! entries stay zero and [`GradientField::get`] returns `None` there.

use sg_core::ImageView;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSample {
    pub gx: f32,
    pub gy: f32,
    pub magnitude: f32,
    /// `atan2(gy, gx)` in radians.
    pub direction: f32,
}

/// Per-pixel gradients of one image, owned by a single processing pass.
#[derive(Debug, Clone)]
pub struct GradientField {
    width: usize,
    height: usize,
    gx: Vec<f32>,
    gy: Vec<f32>,
    mag: Vec<f32>,
    dir: Vec<f32>,
}

impl GradientField {
    pub fn sobel(img: &ImageView<'_, u8>) -> Self {
        let w = img.width();
        let h = img.height();
        let n = w * h;
        let mut field = Self {
            width: w,
            height: h,
            gx: vec![0.0; n],
            gy: vec![0.0; n],
            mag: vec![0.0; n],
            dir: vec![0.0; n],
        };
        if w < 3 || h < 3 {
            return field;
        }

        for y in 1..(h - 1) {
            let r0 = img.row(y - 1);
            let r1 = img.row(y);
            let r2 = img.row(y + 1);
            for x in 1..(w - 1) {
                let p00 = r0[x - 1] as f32;
                let p01 = r0[x] as f32;
                let p02 = r0[x + 1] as f32;
                let p10 = r1[x - 1] as f32;
                let p12 = r1[x + 1] as f32;
                let p20 = r2[x - 1] as f32;
                let p21 = r2[x] as f32;
                let p22 = r2[x + 1] as f32;

                let gxx = (p02 + 2.0 * p12 + p22) - (p00 + 2.0 * p10 + p20);
                let gyy = (p20 + 2.0 * p21 + p22) - (p00 + 2.0 * p01 + p02);

                let idx = y * w + x;
                field.gx[idx] = gxx;
                field.gy[idx] = gyy;
                field.mag[idx] = (gxx * gxx + gyy * gyy).sqrt();
                field.dir[idx] = gyy.atan2(gxx);
            }
        }

        field
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_interior(&self, x: usize, y: usize) -> bool {
        x >= 1 && y >= 1 && x + 1 < self.width && y + 1 < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<GradientSample> {
        if !self.is_interior(x, y) {
            return None;
        }
        let idx = y * self.width + x;
        Some(GradientSample {
            gx: self.gx[idx],
            gy: self.gy[idx],
            magnitude: self.mag[idx],
            direction: self.dir[idx],
        })
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.mag
    }

    pub fn directions(&self) -> &[f32] {
        &self.dir
    }
}

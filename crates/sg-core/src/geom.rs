use core::ops::{Add, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2f {
    pub x: f32,
    pub y: f32,
}

impl Vec2f {
    /// Unit vector at angle `phi` (radians) from the +x axis.
    pub fn from_angle(phi: f32) -> Self {
        Self {
            x: phi.cos(),
            y: phi.sin(),
        }
    }
}

impl Add<Vec2f> for Point2f {
    type Output = Point2f;

    fn add(self, rhs: Vec2f) -> Self::Output {
        Point2f {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Mul<f32> for Vec2f {
    type Output = Vec2f;

    fn mul(self, rhs: f32) -> Self::Output {
        Vec2f {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Axis-aligned rectangle in pixel-center coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect2f {
    pub min: Point2f,
    pub max: Point2f,
}

impl Rect2f {
    /// Smallest rectangle containing every point, `None` for an empty set.
    pub fn bounding(points: impl IntoIterator<Item = Point2f>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut rect = Self {
            min: first,
            max: first,
        };
        for p in it {
            rect.min.x = rect.min.x.min(p.x);
            rect.min.y = rect.min.y.min(p.y);
            rect.max.x = rect.max.x.max(p.x);
            rect.max.y = rect.max.y.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Corners in clockwise order starting at the top-left (y grows down).
    pub fn corners(&self) -> [Point2f; 4] {
        [
            self.min,
            Point2f {
                x: self.max.x,
                y: self.min.y,
            },
            self.max,
            Point2f {
                x: self.min.x,
                y: self.max.y,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{Point2f, Rect2f, Vec2f};

    #[test]
    fn point_moves_along_scaled_direction() {
        let u = Vec2f::from_angle(core::f32::consts::FRAC_PI_2);
        assert!(u.x.abs() < 1e-6);
        assert!((u.y - 1.0).abs() < 1e-6);

        let v = Vec2f { x: 0.5, y: -1.0 };
        assert_eq!(v * 2.0, Vec2f { x: 1.0, y: -2.0 });
        assert_eq!(Point2f { x: 2.0, y: 3.0 } + v, Point2f { x: 2.5, y: 2.0 });
    }

    #[test]
    fn bounding_rect_and_corners() {
        assert!(Rect2f::bounding(Vec::new()).is_none());

        let rect = Rect2f::bounding([
            Point2f { x: 4.0, y: 1.5 },
            Point2f { x: 1.0, y: 6.0 },
            Point2f { x: 2.5, y: 3.0 },
        ])
        .expect("non-empty");

        assert_eq!(rect.min, Point2f { x: 1.0, y: 1.5 });
        assert_eq!(rect.max, Point2f { x: 4.0, y: 6.0 });
        assert!((rect.width() - 3.0).abs() < 1e-6);
        assert!((rect.height() - 4.5).abs() < 1e-6);

        let c = rect.corners();
        assert_eq!(c[1], Point2f { x: 4.0, y: 1.5 });
        assert_eq!(c[3], Point2f { x: 1.0, y: 6.0 });
    }
}

//! Geometry value types used by layout math.
//!
//! All lengths are in device-independent pixels (`f32`).
//!
//! [`Constraints`] is the currency of the widget layout system: every widget
//! reports a minimum and a preferred [`Size`], and containers fold the
//! constraints of their visible children with [`Constraints::width_to_max`],
//! [`Constraints::add_height`] and friends.

use serde::{Deserialize, Serialize};

use crate::error::ConstraintsError;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// A 2D size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Check if the size has zero or negative area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Clip this size component-wise to `bound`.
    ///
    /// A missing bound leaves the size unchanged.
    pub fn clip_to(self, bound: Option<Size>) -> Size {
        match bound {
            Some(bound) => Size::new(self.width.min(bound.width), self.height.min(bound.height)),
            None => self,
        }
    }

    /// Multiply both dimensions by `factor`.
    #[inline]
    pub fn scale(self, factor: f32) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }

    /// Width becomes the larger of this width and `other`'s width.
    #[inline]
    pub fn width_to_max(self, other: Size) -> Size {
        self.width_to_max_value(other.width)
    }

    #[inline]
    pub fn width_to_max_value(self, width: f32) -> Size {
        Size::new(self.width.max(width), self.height)
    }

    /// Adds `other`'s width to this width.
    #[inline]
    pub fn add_width(self, other: Size) -> Size {
        self.add_width_value(other.width)
    }

    #[inline]
    pub fn add_width_value(self, width: f32) -> Size {
        Size::new(self.width + width, self.height)
    }

    /// Height becomes the larger of this height and `other`'s height.
    #[inline]
    pub fn height_to_max(self, other: Size) -> Size {
        self.height_to_max_value(other.height)
    }

    #[inline]
    pub fn height_to_max_value(self, height: f32) -> Size {
        Size::new(self.width, self.height.max(height))
    }

    /// Adds `other`'s height to this height.
    #[inline]
    pub fn add_height(self, other: Size) -> Size {
        self.add_height_value(other.height)
    }

    #[inline]
    pub fn add_height_value(self, height: f32) -> Size {
        Size::new(self.width, self.height + height)
    }
}

impl From<(f32, f32)> for Size {
    fn from((width, height): (f32, f32)) -> Self {
        Self::new(width, height)
    }
}

/// An axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Self = Self {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    #[inline]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(left, top),
            size: Size::new(width, height),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.origin.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.origin.y
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.height
    }

    /// Check if a point is inside the rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left() && point.x < self.right() && point.y >= self.top() && point.y < self.bottom()
    }

    /// Scale the origin and the size by `factor`.
    pub fn scale(&self, factor: f32) -> Rect {
        Rect::new(
            self.left() * factor,
            self.top() * factor,
            self.width() * factor,
            self.height() * factor,
        )
    }

    /// Express this rectangle in the coordinate space whose origin is `origin`'s
    /// top-left corner.
    pub fn relative_to(&self, origin: &Rect) -> Rect {
        Rect::new(
            self.left() - origin.left(),
            self.top() - origin.top(),
            self.width(),
            self.height(),
        )
    }

    /// Inverse of [`relative_to`](Self::relative_to).
    pub fn rebase_to(&self, origin: &Rect) -> Rect {
        Rect::new(
            self.left() + origin.left(),
            self.top() + origin.top(),
            self.width(),
            self.height(),
        )
    }
}

/// Insets from the four edges of a box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Insets {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl Insets {
    pub const ZERO: Self = Self {
        top: 0.0,
        left: 0.0,
        bottom: 0.0,
        right: 0.0,
    };

    #[inline]
    pub const fn new(top: f32, left: f32, bottom: f32, right: f32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Total horizontal inset.
    #[inline]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Total vertical inset.
    #[inline]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Layout requirements of a widget: a minimum and a preferred size.
///
/// The minimum never exceeds the preferred size in either dimension; this is
/// checked by [`Constraints::new`]. The default value has both sizes zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Constraints {
    minimum: Size,
    preferred: Size,
}

impl Constraints {
    /// Create constraints from a minimum and a preferred size.
    ///
    /// # Errors
    ///
    /// Fails if the minimum is larger than the preferred size in either
    /// dimension.
    pub fn new(minimum: Size, preferred: Size) -> Result<Self, ConstraintsError> {
        if minimum.width > preferred.width {
            return Err(ConstraintsError::MinimumWidthExceedsPreferred {
                minimum: minimum.width,
                preferred: preferred.width,
            });
        }
        if minimum.height > preferred.height {
            return Err(ConstraintsError::MinimumHeightExceedsPreferred {
                minimum: minimum.height,
                preferred: preferred.height,
            });
        }
        Ok(Self { minimum, preferred })
    }

    /// Constraints whose preferred size equals the minimum.
    #[inline]
    pub const fn from_minimum(minimum: Size) -> Self {
        Self {
            minimum,
            preferred: minimum,
        }
    }

    #[inline]
    pub fn minimum(&self) -> Size {
        self.minimum
    }

    #[inline]
    pub fn preferred(&self) -> Size {
        self.preferred
    }

    /// Whether both sizes are zero in both dimensions.
    pub fn is_zero(&self) -> bool {
        self.minimum == Size::ZERO && self.preferred == Size::ZERO
    }

    /// Component-wise maximum of the widths of both sizes.
    pub fn width_to_max(self, other: Constraints) -> Constraints {
        Constraints {
            minimum: self.minimum.width_to_max(other.minimum),
            preferred: self.preferred.width_to_max(other.preferred),
        }
    }

    /// Raise both widths to at least `width`.
    pub fn width_to_max_value(self, width: f32) -> Constraints {
        Constraints {
            minimum: self.minimum.width_to_max_value(width),
            preferred: self.preferred.width_to_max_value(width),
        }
    }

    /// Sum the widths of both sizes.
    pub fn add_width(self, other: Constraints) -> Constraints {
        Constraints {
            minimum: self.minimum.add_width(other.minimum),
            preferred: self.preferred.add_width(other.preferred),
        }
    }

    /// Add `width` to both widths.
    pub fn add_width_value(self, width: f32) -> Constraints {
        Constraints {
            minimum: self.minimum.add_width_value(width),
            preferred: self.preferred.add_width_value(width),
        }
    }

    /// Component-wise maximum of the heights of both sizes.
    pub fn height_to_max(self, other: Constraints) -> Constraints {
        Constraints {
            minimum: self.minimum.height_to_max(other.minimum),
            preferred: self.preferred.height_to_max(other.preferred),
        }
    }

    /// Raise both heights to at least `height`.
    pub fn height_to_max_value(self, height: f32) -> Constraints {
        Constraints {
            minimum: self.minimum.height_to_max_value(height),
            preferred: self.preferred.height_to_max_value(height),
        }
    }

    /// Sum the heights of both sizes.
    pub fn add_height(self, other: Constraints) -> Constraints {
        Constraints {
            minimum: self.minimum.add_height(other.minimum),
            preferred: self.preferred.add_height(other.preferred),
        }
    }

    /// Add `height` to both heights.
    pub fn add_height_value(self, height: f32) -> Constraints {
        Constraints {
            minimum: self.minimum.add_height_value(height),
            preferred: self.preferred.add_height_value(height),
        }
    }
}

/// Clamp `value` into `[min, max]`, checking the lower bound first.
///
/// Unlike [`f32::clamp`] this does not panic when `max < min`; a value above
/// `max` then yields `max`. Scroll offsets rely on that when the content is
/// shorter than the viewport.
#[inline]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {

    #[test]
    fn test_constrain_prefers_minimum() {
        assert_eq!(constrain(5.0, 0.0, 10.0), 5.0);
        assert_eq!(constrain(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(constrain(11.0, 0.0, 10.0), 10.0);
        assert_eq!(constrain(3.0, 0.0, -50.0), -50.0);
    }
    use super::*;

    #[test]
    fn test_constraints_reject_minimum_over_preferred() {
        let result = Constraints::new(Size::new(100.0, 50.0), Size::new(50.0, 50.0));
        assert_eq!(
            result,
            Err(ConstraintsError::MinimumWidthExceedsPreferred {
                minimum: 100.0,
                preferred: 50.0
            })
        );

        let result = Constraints::new(Size::new(10.0, 60.0), Size::new(50.0, 50.0));
        assert!(matches!(
            result,
            Err(ConstraintsError::MinimumHeightExceedsPreferred { .. })
        ));
    }

    #[test]
    fn test_constraints_default_is_zero() {
        let constraints = Constraints::default();
        assert!(constraints.is_zero());
        assert_eq!(constraints.minimum(), Size::ZERO);
        assert_eq!(constraints.preferred(), Size::ZERO);
    }

    #[test]
    fn test_constraints_composition() {
        let a = Constraints::new(Size::new(10.0, 5.0), Size::new(20.0, 8.0)).unwrap();
        let b = Constraints::new(Size::new(15.0, 3.0), Size::new(15.0, 4.0)).unwrap();

        let stacked = a.width_to_max(b).add_height(b);
        assert_eq!(stacked.minimum(), Size::new(15.0, 8.0));
        assert_eq!(stacked.preferred(), Size::new(20.0, 12.0));

        let side_by_side = a.add_width(b).height_to_max(b);
        assert_eq!(side_by_side.minimum(), Size::new(25.0, 5.0));
        assert_eq!(side_by_side.preferred(), Size::new(35.0, 8.0));

        let padded = a.add_width_value(1.0).height_to_max_value(20.0);
        assert_eq!(padded.minimum(), Size::new(11.0, 20.0));
        assert_eq!(padded.preferred(), Size::new(21.0, 20.0));
    }

    #[test]
    fn test_size_clip_and_scale() {
        let size = Size::new(100.0, 40.0);
        assert_eq!(size.clip_to(Some(Size::new(50.0, 60.0))), Size::new(50.0, 40.0));
        assert_eq!(size.clip_to(None), size);
        assert_eq!(size.scale(0.5), Size::new(50.0, 20.0));
    }

    #[test]
    fn test_rect_relative_and_rebase() {
        let origin = Rect::new(10.0, 20.0, 100.0, 100.0);
        let rect = Rect::new(15.0, 30.0, 5.0, 6.0);

        let relative = rect.relative_to(&origin);
        assert_eq!(relative, Rect::new(5.0, 10.0, 5.0, 6.0));
        assert_eq!(relative.rebase_to(&origin), rect);
        assert_eq!(rect.scale(2.0), Rect::new(30.0, 60.0, 10.0, 12.0));
        assert!(origin.contains(Point::new(10.0, 20.0)));
        assert!(!origin.contains(Point::new(110.0, 20.0)));
    }
}

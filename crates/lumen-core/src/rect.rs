//! Pixel rectangles used by crop and pixel dumps.

use std::str::FromStr;

use crate::error::{Error, Result};

/// A rectangle in pixel coordinates, as given on the command line.
///
/// Signed so that user input such as `-1,0,4,4` can be represented and
/// rejected by [`Rect::adjust`] instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub w: i32,
    /// Height
    pub h: i32,
}

impl Rect {
    /// Creates a rectangle.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Fits the rectangle inside a `width` x `height` image.
    ///
    /// A negative origin or a non-positive size is rejected. An origin past
    /// the image is pulled back to the last row/column, and the extent is
    /// clipped to the image bounds.
    ///
    /// ```rust
    /// use lumen_core::Rect;
    ///
    /// let r = Rect::new(6, 2, 10, 10).adjust(8, 4).unwrap();
    /// assert_eq!(r, Rect::new(6, 2, 2, 2));
    /// assert!(Rect::new(0, 0, 0, 5).adjust(8, 4).is_err());
    /// ```
    pub fn adjust(self, width: u32, height: u32) -> Result<Rect> {
        if self.x < 0 || self.y < 0 || self.w <= 0 || self.h <= 0 || width == 0 || height == 0 {
            return Err(Error::InvalidRect { x: self.x, y: self.y, w: self.w, h: self.h });
        }
        let width = i64::from(width);
        let height = i64::from(height);
        let x = i64::from(self.x).min(width - 1);
        let y = i64::from(self.y).min(height - 1);
        let end_x = (x + i64::from(self.w)).min(width);
        let end_y = (y + i64::from(self.h)).min(height);
        Ok(Rect {
            x: x as i32,
            y: y as i32,
            w: (end_x - x) as i32,
            h: (end_y - y) as i32,
        })
    }

    /// True when the rectangle has a positive area.
    pub fn is_valid(&self) -> bool {
        self.w > 0 && self.h > 0
    }
}

impl FromStr for Rect {
    type Err = Error;

    /// Parses `x,y,w,h`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::InvalidInput(format!("bad rectangle '{s}': {e}")))?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
            _ => Err(Error::InvalidInput(format!("rectangle '{s}' needs x,y,w,h"))),
        }
    }
}

//! Monochrome drawing canvas with dirty tracking.
//!
//! The canvas keeps a snapshot of the last flushed content so the device
//! layer can skip transmitting regions that did not change. Mutating writes
//! only mark the canvas dirty when a bit actually flips.
//!
//! Upper bounds are exclusive everywhere: valid positions are
//! `0 <= x < width` and `0 <= y < height`.

mod bitmap;
mod text;

pub use bitmap::Bitmap;
pub use text::{Align, TextBoxStyle, TextStyle, DEFAULT_CHAR_SPACING};

use std::ops::Range;
use std::sync::Arc;

use crate::font::Font;
use crate::{Error, Result};

/// Smallest width or height a canvas may have.
pub const MIN_DIMENSION: i32 = 4;

/// Largest width or height a canvas may have.
pub const MAX_DIMENSION: i32 = 4096;

/// Values a blit source may hold. Anything truthy sets a pixel.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for u8 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl Truthy for i32 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

/// The pair of fonts text drawing picks from.
#[derive(Debug, Clone)]
pub struct FontSet {
    pub regular: Arc<Font>,
    pub bold: Arc<Font>,
}

impl FontSet {
    pub fn select(&self, bold: bool) -> &Arc<Font> {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }
}

impl Default for FontSet {
    fn default() -> Self {
        Self {
            regular: Font::regular(),
            bold: Font::bold(),
        }
    }
}

/// Where the next text without explicit coordinates continues.
#[derive(Debug, Clone, Copy, Default)]
struct TextCursor {
    left: i32,
    bottom: Option<i32>,
}

/// A fixed-size monochrome canvas.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: i32,
    height: i32,
    bits: Vec<bool>,
    /// Content at the last flush.
    clean: Option<Vec<bool>>,
    /// Number of bits that differ from `clean`.
    changed: usize,
    /// Set by `clear` until the next flush.
    forced: bool,
    fonts: FontSet,
    cursor: TextCursor,
}

impl Canvas {
    /// Creates a cleared canvas. Dimensions below 4 are raised to 4 and
    /// dimensions above 4096 are lowered to 4096.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_exact_size(
            width.clamp(MIN_DIMENSION, MAX_DIMENSION),
            height.clamp(MIN_DIMENSION, MAX_DIMENSION),
        )
    }

    fn with_exact_size(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
            clean: None,
            changed: 0,
            forced: false,
            fonts: FontSet::default(),
            cursor: TextCursor::default(),
        }
    }

    /// Scratch canvas seeded with existing content, exactly the bitmap's size.
    fn from_bitmap(bitmap: &Bitmap, fonts: FontSet) -> Self {
        let mut canvas = Self::with_exact_size(bitmap.width() as i32, bitmap.height() as i32);
        canvas.bits.copy_from_slice(bitmap.bits());
        canvas.fonts = fonts;
        canvas
    }

    /// Replaces the fonts used for text drawing.
    pub fn with_fonts(mut self, fonts: FontSet) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn set_fonts(&mut self, fonts: FontSet) {
        self.fonts = fonts;
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// True if any bit differs from the last flush, or nothing was flushed yet.
    pub fn is_dirty(&self) -> bool {
        self.clean.is_none() || self.forced || self.changed > 0
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            None
        } else {
            Some((y * self.width + x) as usize)
        }
    }

    fn write(&mut self, index: usize, bit: bool) {
        if self.bits[index] == bit {
            return;
        }
        if let Some(clean) = &self.clean {
            if clean[index] == bit {
                self.changed -= 1;
            } else {
                self.changed += 1;
            }
        }
        self.bits[index] = bit;
    }

    /// Writes a bit, silently clipping positions outside the canvas.
    fn put(&mut self, x: i32, y: i32, bit: bool) {
        if let Some(index) = self.index(x, y) {
            self.write(index, bit);
        }
    }

    fn check_x(&self, x: i32) -> Result<()> {
        if x < 0 || x >= self.width {
            return Err(Error::position(format!(
                "'x' must be between 0 and {}",
                self.width - 1
            )));
        }
        Ok(())
    }

    fn check_y(&self, y: i32) -> Result<()> {
        if y < 0 || y >= self.height {
            return Err(Error::position(format!(
                "'y' must be between 0 and {}",
                self.height - 1
            )));
        }
        Ok(())
    }

    /// Offsets in `0..len` that land inside `0..limit` when added to `origin`.
    fn visible_span(origin: i32, len: i32, limit: i32) -> Range<i32> {
        let origin = i64::from(origin);
        let len = i64::from(len.max(0));
        let start = (-origin).clamp(0, len);
        let end = (i64::from(limit) - origin).clamp(start, len);
        start as i32..end as i32
    }

    fn check_size(w: i32, h: i32) -> Result<()> {
        if w < 1 {
            return Err(Error::position("'w' cannot be less than 1"));
        }
        if h < 1 {
            return Err(Error::position("'h' cannot be less than 1"));
        }
        Ok(())
    }

    /// Sets a single bit.
    pub fn set_bit(&mut self, x: i32, y: i32, bit: bool) -> Result<()> {
        self.check_x(x)?;
        self.check_y(y)?;
        self.put(x, y, bit);
        Ok(())
    }

    /// Gets a single bit, `false` outside the canvas.
    pub fn get_bit(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.bits[i])
    }

    /// Fills the whole canvas. Always marks the canvas dirty.
    pub fn clear(&mut self, bit: bool) {
        for index in 0..self.bits.len() {
            self.write(index, bit);
        }
        self.forced = true;
    }

    /// Draws a horizontal line from `x1` to `x2` inclusive.
    pub fn draw_hline(&mut self, y: i32, x1: i32, x2: i32, bit: bool) -> Result<()> {
        self.check_y(y)?;
        for x in x1.min(x2).max(0)..=x1.max(x2).min(self.width - 1) {
            self.put(x, y, bit);
        }
        Ok(())
    }

    /// Draws a vertical line from `y1` to `y2` inclusive.
    pub fn draw_vline(&mut self, x: i32, y1: i32, y2: i32, bit: bool) -> Result<()> {
        self.check_x(x)?;
        for y in y1.min(y2).max(0)..=y1.max(y2).min(self.height - 1) {
            self.put(x, y, bit);
        }
        Ok(())
    }

    /// Draws a line between two points.
    ///
    /// Sloped lines plot one point per column, rounding half up.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, bit: bool) -> Result<()> {
        if y1 == y2 {
            return self.draw_hline(y1, x1, x2, bit);
        }
        if x1 == x2 {
            return self.draw_vline(x1, y1, y2, bit);
        }

        let ((x1, y1), (x2, y2)) = if x1 < x2 {
            ((x1, y1), (x2, y2))
        } else {
            ((x2, y2), (x1, y1))
        };

        let slope = (f64::from(y2) - f64::from(y1)) / (f64::from(x2) - f64::from(x1));
        let intercept = f64::from(y1) - slope * f64::from(x1);

        for x in x1.max(0)..=x2.min(self.width - 1) {
            let y = (slope * f64::from(x) + intercept + 0.5).floor() as i32;
            self.put(x, y, bit);
        }
        Ok(())
    }

    /// Draws the outline of a rectangle.
    ///
    /// Edges that fall outside the canvas are skipped.
    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, bit: bool) -> Result<()> {
        Self::check_size(w, h)?;
        let x2 = x.saturating_add(w - 1);
        let y2 = y.saturating_add(h - 1);

        for row in [y, y2] {
            if (0..self.height).contains(&row) {
                self.draw_hline(row, x, x2, bit)?;
            }
        }
        for col in [x, x2] {
            if (0..self.width).contains(&col) {
                self.draw_vline(col, y, y2, bit)?;
            }
        }
        Ok(())
    }

    /// Fills a rectangle, clipped to the canvas.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, bit: bool) -> Result<()> {
        Self::check_size(w, h)?;
        for dy in Self::visible_span(y, h, self.height) {
            for dx in Self::visible_span(x, w, self.width) {
                self.put(x + dx, y + dy, bit);
            }
        }
        Ok(())
    }

    /// Copies a `w` x `h` region onto the canvas at `(x, y)`.
    ///
    /// `map` receives the source offset of each destination cell inside the
    /// canvas and returns the bit to write, or `None` to leave it unchanged.
    pub fn blit<F>(&mut self, x: i32, y: i32, w: i32, h: i32, map: F) -> Result<()>
    where
        F: FnMut(i32, i32) -> Option<bool>,
    {
        Self::check_size(w, h)?;
        self.blit_unchecked(x, y, w, h, map);
        Ok(())
    }

    fn blit_unchecked<F>(&mut self, x: i32, y: i32, w: i32, h: i32, mut map: F)
    where
        F: FnMut(i32, i32) -> Option<bool>,
    {
        for dy in Self::visible_span(y, h, self.height) {
            for dx in Self::visible_span(x, w, self.width) {
                if let Some(index) = self.index(x + dx, y + dy) {
                    if let Some(bit) = map(dx, dy) {
                        self.write(index, bit);
                    }
                }
            }
        }
    }

    /// Blits a row-major matrix; truthy cells are set, everything else is
    /// cleared. Cells missing from `data` count as clear.
    pub fn blit_matrix<R, T>(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[R]) -> Result<()>
    where
        R: AsRef<[T]>,
        T: Truthy,
    {
        self.blit(x, y, w, h, |dx, dy| {
            Some(
                data.get(dy as usize)
                    .and_then(|row| row.as_ref().get(dx as usize))
                    .is_some_and(Truthy::is_truthy),
            )
        })
    }

    /// Blits a whole bitmap with its top-left corner at `(x, y)`.
    pub fn blit_bitmap(&mut self, x: i32, y: i32, bitmap: &Bitmap) {
        let w = i32::try_from(bitmap.width()).unwrap_or(i32::MAX);
        let h = i32::try_from(bitmap.height()).unwrap_or(i32::MAX);
        self.blit_unchecked(x, y, w, h, |dx, dy| Some(bitmap.get(dx, dy)));
    }

    /// Copies the whole canvas.
    pub fn snapshot(&self) -> Bitmap {
        Bitmap::from_bits(self.width as usize, self.height as usize, self.bits.clone())
    }

    /// Copies a region. Cells outside the canvas are clear.
    pub fn snapshot_region(&self, x: i32, y: i32, w: i32, h: i32) -> Bitmap {
        let (w, h) = (w.max(0), h.max(0));
        let mut bits = Vec::with_capacity(w as usize * h as usize);
        for dy in 0..h {
            for dx in 0..w {
                let bit = match (x.checked_add(dx), y.checked_add(dy)) {
                    (Some(xx), Some(yy)) => self.get_bit(xx, yy),
                    _ => false,
                };
                bits.push(bit);
            }
        }
        Bitmap::from_bits(w as usize, h as usize, bits)
    }

    /// True if any cell in the region differs from the last flush, or if
    /// nothing was flushed yet.
    pub fn is_dirty_rect(&self, x: i32, y: i32, w: i32, h: i32) -> Result<bool> {
        self.check_x(x)?;
        self.check_y(y)?;
        Self::check_size(w, h)?;
        let x2 = x.saturating_add(w - 1);
        let y2 = y.saturating_add(h - 1);
        if x2 >= self.width {
            return Err(Error::position(format!(
                "'w' must not be greater than {} - 'x'",
                self.width
            )));
        }
        if y2 >= self.height {
            return Err(Error::position(format!(
                "'h' must not be greater than {} - 'y'",
                self.height
            )));
        }

        let Some(clean) = &self.clean else {
            return Ok(true);
        };

        let dirty = (y..=y2).any(|yy| {
            let start = (yy * self.width + x) as usize;
            let end = (yy * self.width + x2) as usize;
            self.bits[start..=end] != clean[start..=end]
        });
        Ok(dirty)
    }

    /// Takes the current content as the new clean baseline.
    pub fn flush(&mut self) {
        self.clean = Some(self.bits.clone());
        self.changed = 0;
        self.forced = false;
    }
}

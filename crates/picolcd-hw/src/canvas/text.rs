//! Text drawing.

use std::fmt;
use std::str::FromStr;

use super::Canvas;
use crate::font::Font;
use crate::{Error, Result};

/// Pixels added after every non-empty glyph. The built-in glyphs carry a
/// blank column on each side, so -1 leaves a one pixel gap.
pub const DEFAULT_CHAR_SPACING: i32 = -1;

/// Horizontal alignment inside a text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl FromStr for Align {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Align::Left),
            "center" | "centre" => Ok(Align::Center),
            "right" => Ok(Align::Right),
            _ => Err(Error::validation(format!("unknown alignment: {s}"))),
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Align::Left => write!(f, "left"),
            Align::Center => write!(f, "center"),
            Align::Right => write!(f, "right"),
        }
    }
}

/// How glyphs are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    /// Use the bold font.
    pub bold: bool,
    /// Value written for set glyph pixels. Clear glyph pixels are left alone.
    pub bit: bool,
    /// Pixels added after each glyph.
    pub char_spacing: i32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            bold: false,
            bit: true,
            char_spacing: DEFAULT_CHAR_SPACING,
        }
    }
}

/// How a text box is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBoxStyle {
    pub text: TextStyle,
    pub align: Align,
    /// Draw a 1px border inside the box and lay text out within it.
    pub border: bool,
    /// Fill the box with the inverse of `text.bit` first.
    pub fill: bool,
}

impl Canvas {
    /// Draws text with its top edge at `y`.
    ///
    /// Omitted coordinates continue where the previous text ended. Each
    /// `\n` starts a new line one font height lower.
    pub fn draw_text(&mut self, text: &str, x: Option<i32>, y: Option<i32>, style: TextStyle) {
        let font = self.fonts.select(style.bold).clone();
        let line_height = font.height() as i32;

        let left = x.unwrap_or(self.cursor.left);
        let mut bottom = match y {
            Some(y) => y.saturating_add(line_height),
            None => self.cursor.bottom.unwrap_or(line_height),
        };

        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                bottom = bottom.saturating_add(line_height);
            }
            self.draw_text_line(&font, line, left, bottom, style);
        }
    }

    fn draw_text_line(&mut self, font: &Font, line: &str, left: i32, bottom: i32, style: TextStyle) {
        let mut x = left;
        for glyph in font.glyphs(line) {
            if x >= self.width {
                break;
            }
            if glyph.width() == 0 {
                continue;
            }

            let (w, h) = (glyph.width() as i32, glyph.height() as i32);
            self.blit_unchecked(x, bottom.saturating_sub(h), w, h, |gx, gy| {
                glyph.bit(gx as usize, gy as usize).then_some(style.bit)
            });
            x = x.saturating_add(w).saturating_add(style.char_spacing);
        }

        self.cursor.left = x;
        self.cursor.bottom = Some(bottom);
    }

    /// Draws word-wrapped text inside a box.
    ///
    /// Lines that do not fit the box height are dropped. Pixels inside the
    /// box that text does not touch keep their current value unless `fill`
    /// is set.
    pub fn draw_text_box(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        style: TextBoxStyle,
    ) -> Result<()> {
        Self::check_size(w, h)?;
        let bit = style.text.bit;

        if style.fill {
            self.fill_rect(x, y, w, h, !bit)?;
        }

        let (mut x, mut y, mut w, mut h) = (x, y, w, h);
        if style.border {
            self.draw_rect(x, y, w, h, bit)?;
            x = x.saturating_add(1);
            y = y.saturating_add(1);
            w -= 2;
            h -= 2;
        }
        if w < 1 || h < 1 {
            return Ok(());
        }

        let font = self.fonts.select(style.text.bold).clone();
        let line_height = font.height() as i32;
        let layout = font.measure(text, Some(w as usize));

        // Render into the part of the box that is on the canvas.
        let cols = Self::visible_span(x, w, self.width);
        let rows = Self::visible_span(y, h, self.height);
        if cols.is_empty() || rows.is_empty() {
            return Ok(());
        }
        let (left_x, top_y) = (x + cols.start, y + rows.start);
        let region = self.snapshot_region(left_x, top_y, cols.end - cols.start, rows.end - rows.start);
        let mut scratch = Canvas::from_bitmap(&region, self.fonts.clone());

        let mut top = 0;
        for line in &layout.lines {
            if top + line_height > h {
                break;
            }
            let line_width = font.text_width(line) as i32;
            let left = match style.align {
                Align::Left => 0,
                Align::Center => (w - line_width) / 2,
                Align::Right => w - line_width,
            };
            scratch.draw_text(
                line,
                Some(left.max(0) - cols.start),
                Some(top - rows.start),
                style.text,
            );
            top += line_height;
        }

        self.blit_bitmap(left_x, top_y, &scratch.snapshot());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontDescription, GlyphDescription, GlyphRow};
    use crate::FontSet;
    use std::sync::Arc;

    /// Font where `a` is a solid 2x3 block, `b` a solid 3x2 block and space
    /// a blank 1x1 cell.
    fn block_fonts() -> FontSet {
        let block = |code: char, width: usize, height: usize| GlyphDescription {
            code: code as u32,
            width,
            height,
            rows: (0..height)
                .map(|_| GlyphRow::Text("#".repeat(width)))
                .collect(),
        };
        let font = Font::from_description(&FontDescription {
            glyphs: vec![
                block('a', 2, 3),
                block('b', 3, 2),
                GlyphDescription {
                    code: 32,
                    width: 1,
                    height: 1,
                    rows: vec![GlyphRow::Text(" ".into())],
                },
            ],
            ..Default::default()
        })
        .unwrap();
        let font = Arc::new(font);
        FontSet {
            regular: font.clone(),
            bold: font,
        }
    }

    fn spaced(char_spacing: i32) -> TextStyle {
        TextStyle {
            char_spacing,
            ..Default::default()
        }
    }

    #[test]
    fn test_glyphs_bottom_aligned() {
        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        canvas.draw_text("ab", Some(0), Some(0), spaced(0));

        // `a` fills rows 0..3, `b` only the bottom two rows.
        assert!(canvas.get_bit(0, 0) && canvas.get_bit(1, 2));
        assert!(!canvas.get_bit(2, 0));
        assert!(canvas.get_bit(2, 1) && canvas.get_bit(4, 2));
        assert!(!canvas.get_bit(5, 2));
        assert_eq!(canvas.snapshot().count_set(), 12);
    }

    #[test]
    fn test_char_spacing() {
        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        canvas.draw_text("aa", Some(0), Some(0), spaced(1));
        assert!(canvas.get_bit(1, 0));
        assert!(!canvas.get_bit(2, 0));
        assert!(canvas.get_bit(3, 0));
    }

    #[test]
    fn test_continues_previous_text() {
        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        canvas.draw_text("a", Some(1), Some(2), spaced(0));
        canvas.draw_text("a", None, None, spaced(0));
        assert!(canvas.get_bit(3, 2) && canvas.get_bit(4, 4));
        assert!(!canvas.get_bit(3, 1) && !canvas.get_bit(5, 2));
    }

    #[test]
    fn test_hard_breaks() {
        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        canvas.draw_text("a\na", Some(0), Some(0), spaced(0));
        assert!(canvas.get_bit(0, 3) && canvas.get_bit(0, 5));
        assert_eq!(canvas.snapshot().count_set(), 12);
    }

    #[test]
    fn test_clear_pixels_are_transparent() {
        let mut canvas = Canvas::new(16, 8);
        canvas.clear(true);
        canvas.draw_text("i", Some(0), Some(0), TextStyle::default());
        // Blank padding columns of the glyph leave the background alone.
        assert!(canvas.get_bit(0, 0));
    }

    #[test]
    fn test_text_redraw_not_dirty() {
        for bold in [false, true] {
            let mut canvas = Canvas::new(64, 64);
            canvas.flush();
            for (bit, expect_dirty) in [(true, true), (true, false), (false, true), (false, false)] {
                let style = TextStyle {
                    bold,
                    bit,
                    ..Default::default()
                };
                canvas.draw_text("Hello World", Some(0), Some(0), style);
                assert_eq!(canvas.is_dirty(), expect_dirty, "bold={bold} bit={bit}");
                canvas.flush();
            }
        }
    }

    #[test]
    fn test_text_box_redraw_not_dirty() {
        for bold in [false, true] {
            let mut canvas = Canvas::new(64, 64);
            canvas.flush();
            for (bit, expect_dirty) in [(true, true), (true, false), (false, true), (false, false)] {
                let style = TextBoxStyle {
                    text: TextStyle {
                        bold,
                        bit,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                canvas
                    .draw_text_box("Hello World", 1, 1, 30, 15, style)
                    .unwrap();
                assert_eq!(canvas.is_dirty(), expect_dirty, "bold={bold} bit={bit}");
                canvas.flush();
            }
        }
    }

    #[test]
    fn test_text_box_clips_to_box() {
        let mut canvas = Canvas::new(64, 32);
        canvas
            .draw_text_box("Hello World again", 2, 2, 20, 12, TextBoxStyle::default())
            .unwrap();
        let total = canvas.snapshot().count_set();
        assert!(total > 0);
        assert_eq!(canvas.snapshot_region(2, 2, 20, 12).count_set(), total);
    }

    #[test]
    fn test_text_box_drops_overflow_lines() {
        let mut canvas = Canvas::new(64, 32).with_fonts(block_fonts());
        // Three lines of height 3 in a box 7 high: only two fit.
        canvas
            .draw_text_box("a a a", 0, 0, 2, 7, TextBoxStyle::default())
            .unwrap();
        assert!(canvas.get_bit(0, 5));
        assert!(!canvas.get_bit(0, 6));
        assert_eq!(canvas.snapshot().count_set(), 12);
    }

    #[test]
    fn test_text_box_alignment() {
        let style = |align| TextBoxStyle {
            align,
            text: spaced(0),
            ..Default::default()
        };

        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        canvas.draw_text_box("a", 0, 0, 10, 3, style(Align::Right)).unwrap();
        assert!(canvas.get_bit(8, 0) && canvas.get_bit(9, 0));
        assert!(!canvas.get_bit(7, 0));

        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        canvas.draw_text_box("a", 0, 0, 10, 3, style(Align::Center)).unwrap();
        assert!(canvas.get_bit(4, 0) && canvas.get_bit(5, 0));
        assert!(!canvas.get_bit(3, 0) && !canvas.get_bit(6, 0));
    }

    #[test]
    fn test_text_box_border_and_fill() {
        let mut canvas = Canvas::new(16, 16).with_fonts(block_fonts());
        canvas.clear(true);
        let style = TextBoxStyle {
            border: true,
            fill: true,
            ..Default::default()
        };
        canvas.draw_text_box("", 0, 0, 6, 6, style).unwrap();
        // Border set, interior filled with the inverse bit.
        assert_eq!(canvas.snapshot_region(0, 0, 6, 6).count_set(), 20);
        assert!(!canvas.get_bit(2, 2));
        assert!(canvas.get_bit(6, 6));
    }

    #[test]
    fn test_text_box_keeps_background() {
        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        for x in (0..16).step_by(2) {
            canvas.draw_vline(x, 0, 7, true).unwrap();
        }
        let before = canvas.snapshot();

        let style = TextBoxStyle {
            text: spaced(0),
            ..Default::default()
        };
        canvas.draw_text_box("b", 3, 2, 8, 4, style).unwrap();

        // `b` covers (3..6, 3..5); everything else keeps the stripes.
        for y in 0..8 {
            for x in 0..16 {
                let under_glyph = (3..6).contains(&x) && (3..5).contains(&y);
                let expected = under_glyph || before.get(x, y);
                assert_eq!(canvas.get_bit(x, y), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_text_box_partly_offscreen() {
        let mut canvas = Canvas::new(16, 8).with_fonts(block_fonts());
        let style = TextBoxStyle {
            text: spaced(0),
            align: Align::Right,
            ..Default::default()
        };
        // Right-aligned in a box starting at -5, the glyph lands on columns 3..5.
        canvas.draw_text_box("a", -5, -1, 10, 4, style).unwrap();
        assert!(canvas.get_bit(3, 0) && canvas.get_bit(4, 1));
        assert!(!canvas.get_bit(2, 0) && !canvas.get_bit(5, 0));
        assert_eq!(canvas.snapshot().count_set(), 4);

        canvas
            .draw_text_box("a a", i32::MAX - 1, i32::MAX - 1, i32::MAX, i32::MAX, style)
            .unwrap();
        canvas
            .draw_text_box("a a", i32::MIN, i32::MIN, i32::MAX, i32::MAX, style)
            .unwrap();
        assert_eq!(canvas.snapshot().count_set(), 4);
    }

    #[test]
    fn test_align_from_str() {
        assert_eq!("Center".parse::<Align>().unwrap(), Align::Center);
        assert!("middle".parse::<Align>().is_err());
    }
}

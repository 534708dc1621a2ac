//! Bitmap fonts and text layout.
//!
//! Fonts are built once from a [`FontDescription`], validated atomically and
//! immutable afterwards. Two built-in 8px fonts are available through
//! [`Font::regular`] and [`Font::bold`].

mod builtin;
mod description;

pub use description::{Cell, FontDescription, GlyphDescription, GlyphRow};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::{Error, Result};

/// First printable character code a font may define.
pub const FIRST_CODE: u8 = 32;

/// Last printable character code a font may define.
pub const LAST_CODE: u8 = 126;

/// Fixed-size monochrome bitmap for one character code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    code: u8,
    width: usize,
    height: usize,
    rows: Vec<Vec<bool>>,
}

impl Glyph {
    /// Rows must already be `height` x `width`.
    fn new(code: u8, width: usize, height: usize, rows: Vec<Vec<bool>>) -> Self {
        debug_assert!(rows.len() == height && rows.iter().all(|r| r.len() == width));
        Self {
            code,
            width,
            height,
            rows,
        }
    }

    /// The 0x0 glyph returned for undefined codes.
    fn empty() -> Self {
        Self {
            code: 0,
            width: 0,
            height: 0,
            rows: Vec::new(),
        }
    }

    /// Character code, 0 for the empty glyph.
    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major bit matrix.
    pub fn rows(&self) -> &[Vec<bool>] {
        &self.rows
    }

    /// Returns a single bit, `false` outside the glyph.
    pub fn bit(&self, x: usize, y: usize) -> bool {
        self.rows
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// True for the 0x0 glyph.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Result of [`Font::measure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Measurement {
    /// Widest produced line.
    pub width: usize,
    /// Sum of the line heights.
    pub height: usize,
    /// Produced lines, in order.
    pub lines: Vec<String>,
}

impl Measurement {
    fn push_line(&mut self, line: String, width: usize, height: usize) {
        self.width = self.width.max(width);
        self.height += height;
        self.lines.push(line);
    }
}

/// A bitmap font.
#[derive(Debug, Clone)]
pub struct Font {
    name: String,
    size: u32,
    bold: bool,
    glyphs: BTreeMap<u8, Glyph>,
    height: usize,
    empty: Glyph,
}

static REGULAR: OnceLock<Arc<Font>> = OnceLock::new();
static BOLD: OnceLock<Arc<Font>> = OnceLock::new();

impl Font {
    /// Builds a font from a description.
    ///
    /// Any malformed glyph fails the whole font.
    pub fn from_description(description: &FontDescription) -> Result<Self> {
        let mut glyphs = BTreeMap::new();

        for glyph in &description.glyphs {
            let glyph = glyph.to_glyph()?;
            let code = glyph.code();
            if glyphs.insert(code, glyph).is_some() {
                return Err(Error::validation(format!(
                    "character code {code} is defined more than once"
                )));
            }
        }

        let height = glyphs.values().map(Glyph::height).max().unwrap_or(0);

        Ok(Self {
            name: description.name.clone(),
            size: description.size,
            bold: description.bold,
            glyphs,
            height,
            empty: Glyph::empty(),
        })
    }

    /// Parses a TOML font description.
    pub fn from_toml(content: &str) -> Result<Self> {
        let description: FontDescription = toml::from_str(content)?;
        Self::from_description(&description)
    }

    /// Loads a TOML font description from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let font = Self::from_toml(&content)?;
        debug!("Loaded font {} from {}", font, path.as_ref().display());
        Ok(font)
    }

    /// Built-in regular font.
    pub fn regular() -> Arc<Font> {
        REGULAR
            .get_or_init(|| {
                Arc::new(
                    Font::from_description(&builtin::regular())
                        .expect("Failed to build embedded regular font"),
                )
            })
            .clone()
    }

    /// Built-in bold font.
    pub fn bold() -> Arc<Font> {
        BOLD.get_or_init(|| {
            Arc::new(
                Font::from_description(&builtin::bold())
                    .expect("Failed to build embedded bold font"),
            )
        })
        .clone()
    }

    /// Converts the font back into a loadable description.
    pub fn to_description(&self) -> FontDescription {
        FontDescription {
            name: self.name.clone(),
            size: self.size,
            bold: self.bold,
            glyphs: self.glyphs.values().map(GlyphDescription::from).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Height of the tallest glyph.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Glyph for the first byte of `text`, or the 0x0 glyph.
    pub fn glyph(&self, text: &str) -> &Glyph {
        text.bytes()
            .next()
            .and_then(|code| self.glyphs.get(&code))
            .unwrap_or(&self.empty)
    }

    /// Glyph for a single character, or the 0x0 glyph.
    pub fn glyph_for(&self, ch: char) -> &Glyph {
        u8::try_from(ch)
            .ok()
            .and_then(|code| self.glyphs.get(&code))
            .unwrap_or(&self.empty)
    }

    /// One glyph per character of `text`.
    pub fn glyphs(&self, text: &str) -> Vec<&Glyph> {
        text.chars().map(|ch| self.glyph_for(ch)).collect()
    }

    /// Sum of the glyph widths of a single line.
    pub fn text_width(&self, text: &str) -> usize {
        text.chars().map(|ch| self.glyph_for(ch).width()).sum()
    }

    /// Measures `text`, optionally wrapping it on word boundaries to fit
    /// `max_width`.
    ///
    /// Whitespace runs collapse to a single space and `\n` is a hard break.
    /// A single word wider than `max_width` is kept whole.
    pub fn measure(&self, text: &str, max_width: Option<usize>) -> Measurement {
        let mut measurement = Measurement::default();

        for line in hard_lines(text) {
            let line = collapse_whitespace(line);
            match max_width.filter(|&w| w > 0) {
                Some(max_width) => self.wrap_line(line.trim(), max_width, &mut measurement),
                None => {
                    let width = self.text_width(&line);
                    measurement.push_line(line, width, self.height);
                }
            }
        }

        measurement
    }

    fn wrap_line(&self, line: &str, max_width: usize, measurement: &mut Measurement) {
        if line.is_empty() {
            measurement.push_line(String::new(), 0, self.height);
            return;
        }

        let mut rest = line;
        loop {
            let width = self.text_width(rest);
            if width <= max_width || !rest.contains(' ') {
                measurement.push_line(rest.to_string(), width, self.height);
                return;
            }

            // Peel words off the end until the head fits or is a single word.
            let mut split = rest.len();
            while let Some(pos) = rest[..split].rfind(' ') {
                split = pos;
                let head = &rest[..split];
                if self.text_width(head) <= max_width || !head.contains(' ') {
                    break;
                }
            }

            let head = &rest[..split];
            measurement.push_line(head.to_string(), self.text_width(head), self.height);
            rest = &rest[split + 1..];
        }
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weight = if self.bold { "Bold" } else { "Regular" };
        write!(f, "{} {} {}pt", self.name, weight, self.size)
    }
}

/// Splits on `\n`, dropping trailing empty segments but keeping at least one.
fn hard_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_space = false;
    for ch in line.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

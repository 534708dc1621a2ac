//! Declarative font descriptions.
//!
//! A description is plain data (usually a TOML file) that is validated once
//! into an immutable [`Font`](super::Font):
//!
//! ```toml
//! name = "Tiny"
//! size = 6
//!
//! [[glyph]]
//! code = 97
//! width = 3
//! height = 3
//! rows = [" # ", "# #", [1, 1, 1]]
//! ```

use serde::{Deserialize, Serialize};

use super::{Glyph, FIRST_CODE, LAST_CODE};
use crate::{Error, Result};

/// A font as declarative data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDescription {
    /// Font family name
    #[serde(default = "default_name")]
    pub name: String,

    /// Point size the glyphs were drawn at
    #[serde(default = "default_size")]
    pub size: u32,

    /// Bold flag
    #[serde(default)]
    pub bold: bool,

    /// Glyph table
    #[serde(default, rename = "glyph")]
    pub glyphs: Vec<GlyphDescription>,
}

/// One glyph as declarative data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphDescription {
    /// ASCII character code (32..=126).
    pub code: u32,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Exactly `height` rows of exactly `width` cells.
    #[serde(default)]
    pub rows: Vec<GlyphRow>,
}

/// A glyph row: a string where any non-space character is a set pixel, or
/// a sequence of booleans / 0-1 integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlyphRow {
    Text(String),
    Cells(Vec<Cell>),
}

/// A single cell of a [`GlyphRow::Cells`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Flag(bool),
    Number(i64),
}

fn default_name() -> String {
    "Font".to_string()
}

fn default_size() -> u32 {
    8
}

impl Default for FontDescription {
    fn default() -> Self {
        Self {
            name: default_name(),
            size: default_size(),
            bold: false,
            glyphs: Vec::new(),
        }
    }
}

impl Cell {
    fn is_set(self) -> Option<bool> {
        match self {
            Cell::Flag(bit) => Some(bit),
            Cell::Number(0) => Some(false),
            Cell::Number(1) => Some(true),
            Cell::Number(_) => None,
        }
    }
}

impl GlyphRow {
    fn to_bits(&self, code: u32, index: usize, width: usize) -> Result<Vec<bool>> {
        let bits = match self {
            GlyphRow::Text(text) => text.chars().map(|ch| ch != ' ').collect::<Vec<_>>(),
            GlyphRow::Cells(cells) => cells
                .iter()
                .map(|cell| cell.is_set())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    Error::validation(format!(
                        "glyph {code} row {index} has a cell that is not a boolean, 0 or 1"
                    ))
                })?,
        };

        if bits.len() != width {
            return Err(Error::validation(format!(
                "glyph {code} row {index} has {} columns, expected {width}",
                bits.len()
            )));
        }

        Ok(bits)
    }

    /// Encodes a row of bits as text, `#` for set pixels.
    pub fn from_bits(bits: &[bool]) -> Self {
        GlyphRow::Text(bits.iter().map(|&b| if b { '#' } else { ' ' }).collect())
    }
}

impl GlyphDescription {
    /// Validates this description into a glyph.
    pub(super) fn to_glyph(&self) -> Result<Glyph> {
        let code = u8::try_from(self.code)
            .ok()
            .filter(|c| (FIRST_CODE..=LAST_CODE).contains(c))
            .ok_or_else(|| {
                Error::validation(format!(
                    "character code {} is outside {FIRST_CODE}..={LAST_CODE}",
                    self.code
                ))
            })?;

        if self.rows.len() != self.height {
            return Err(Error::validation(format!(
                "glyph {} has {} rows, expected {}",
                self.code,
                self.rows.len(),
                self.height
            )));
        }

        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| row.to_bits(self.code, index, self.width))
            .collect::<Result<Vec<_>>>()?;

        Ok(Glyph::new(code, self.width, self.height, rows))
    }
}

impl From<&Glyph> for GlyphDescription {
    fn from(glyph: &Glyph) -> Self {
        Self {
            code: glyph.code() as u32,
            width: glyph.width(),
            height: glyph.height(),
            rows: glyph.rows().iter().map(|row| GlyphRow::from_bits(row)).collect(),
        }
    }
}

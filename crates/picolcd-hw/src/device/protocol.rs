//! picoLCD 256x64 protocol definitions and encoding.
//!
//! Protocol structure:
//! - Every report starts with a single type byte
//! - Outbound display data goes through four 64x64 controller chips
//! - Each chip memory line holds 8 pixel rows, one byte per column
//! - A memory line is sent as a 44-byte command+data packet followed by a
//!   37-byte data packet, 32 columns each

use std::fmt;

use crate::canvas::Canvas;
use crate::flags::FlagSet;

/// Largest inbound report read in one go.
pub const REPORT_SIZE: usize = 64;

/// Number of controller chips, each driving a 64 column block.
pub const CHIP_COUNT: usize = 4;

/// Columns driven by one chip.
pub const CHIP_WIDTH: usize = 64;

/// Memory lines per chip.
pub const LINE_COUNT: usize = 8;

/// Pixel rows packed into one memory line.
pub const LINE_HEIGHT: usize = 8;

/// Columns carried by each half of a paint packet pair.
pub const HALF_LINE: usize = 32;

/// Header length of the command+data paint packet.
pub const PAINT_HEADER_SIZE: usize = 12;

/// Header length of the data continuation packet.
pub const DATA_HEADER_SIZE: usize = 5;

/// Delay parameter used by the chip init command.
pub const COMMAND_DELAY: u8 = 0x64;

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            /// Looks up a code by its wire value.
            pub fn from_byte(value: u8) -> Option<Self> {
                match value {
                    $(v if v == $value => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Protocol name of the code.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl FlagSet for $name {
            const ALL: &'static [Self] = &[$($name::$variant,)+];

            fn value(self) -> u32 {
                self as u32
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

code_table! {
    /// Inbound report types.
    pub enum InReport {
        PowerState = 0x01 => "POWER_STATE",
        KeyState = 0x11 => "KEY_STATE",
        IrData = 0x21 => "IR_DATA",
        ExtEepromData = 0x31 => "EXT_EE_DATA",
        IntEepromData = 0x32 => "INT_EE_DATA",
    }
}

code_table! {
    /// Outbound report types.
    pub enum OutReport {
        LedState = 0x81 => "LED_STATE",
        LcdBacklight = 0x91 => "LCD_BACKLIGHT",
        LcdContrast = 0x92 => "LCD_CONTRAST",
        LcdReset = 0x93 => "LCD_RESET",
        Cmd = 0x94 => "CMD",
        Data = 0x95 => "DATA",
        CmdData = 0x96 => "CMD_DATA",
        ExtEepromRead = 0xA1 => "EXT_EE_READ",
        ExtEepromWrite = 0xA2 => "EXT_EE_WRITE",
        IntEepromRead = 0xA3 => "INT_EE_READ",
        IntEepromWrite = 0xA4 => "INT_EE_WRITE",
        Relay = 0xB1 => "RELAY",
        TestSplash = 0xC1 => "TESTSPLASH",
    }
}

code_table! {
    /// Device-level requests. Responses carry the request code as their type.
    pub enum HidReport {
        Error = 0x10 => "ERROR",
        GetVersion1 = 0xF1 => "GET_VERSION_1",
        GetMaxStxSize = 0xF6 => "GET_MAX_STX_SIZE",
        GetVersion2 = 0xF7 => "GET_VERSION_2",
        SetSnoozeTime = 0xF8 => "SET_SNOOZE_TIME",
        ExitKeyboard = 0xEF => "EXIT_KEYBOARD",
        ExitFlasher = 0xFF => "EXIT_FLASHER",
    }
}

code_table! {
    /// Code memory requests, valid in flasher mode.
    pub enum FlashReport {
        EraseMemory = 0xF2 => "ERASE_MEMORY",
        ReadMemory = 0xF3 => "READ_MEMORY",
        WriteMemory = 0xF4 => "WRITE_MEMORY",
    }
}

code_table! {
    /// Splash memory requests, valid in flasher mode.
    pub enum KeyboardReport {
        Memory = 0x41 => "MEMORY",
        EraseMemory = 0xB2 => "ERASE_MEMORY",
        ReadMemory = 0xB3 => "READ_MEMORY",
        WriteMemory = 0xB4 => "WRITE_MEMORY",
    }
}

code_table! {
    /// Status codes reported by the device.
    pub enum Status {
        Ok = 0x00 => "OK",
        Erase = 0x01 => "ERASE",
        Write = 0x02 => "WRITE",
        Read = 0x03 => "READ",
        Key = 0x10 => "KEY",
        Ir = 0x11 => "IR",
        Ver = 0x12 => "VER",
        Disconnected = 0x13 => "DISCONNECTED",
        Error = 0xFF => "ERROR",
    }
}

code_table! {
    /// Flashable memory regions.
    pub enum FlashType {
        CodeMemory = 0x00 => "CODE_MEMORY",
        EpromExternal = 0x01 => "EPROM_EXTERNAL",
        EpromInternal = 0x02 => "EPROM_INTERNAL",
        CodeSplash = 0x03 => "CODE_SPLASH",
    }
}

code_table! {
    /// Results of flash requests.
    pub enum RequestResult {
        Ok = 0x00 => "OK",
        ParamMissing = 0x01 => "PARAM_MISSING",
        DataMissing = 0x02 => "DATA_MISSING",
        BlockReadOnly = 0x03 => "BLOCK_READ_ONLY",
        BlockNotErasable = 0x04 => "BLOCK_NOT_ERASABLE",
        BlockTooBig = 0x05 => "BLOCK_TOO_BIG",
        SectionOverflow = 0x06 => "SECTION_OVERFLOW",
    }
}

/// Describes a report type byte for diagnostics.
pub fn report_name(kind: u8) -> &'static str {
    InReport::from_byte(kind)
        .map(InReport::name)
        .or_else(|| HidReport::from_byte(kind).map(HidReport::name))
        .unwrap_or("UNKNOWN")
}

/// Firmware version reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Splash storage usage reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct SplashSize {
    pub size: u16,
    pub max: u16,
}

/// Parses a version response payload. The minor number comes first.
pub fn parse_version(payload: &[u8]) -> Option<Version> {
    match payload {
        [minor, major, ..] => Some(Version {
            major: *major,
            minor: *minor,
        }),
        _ => None,
    }
}

/// Parses a splash size response payload: max then used size, both little-endian.
pub fn parse_splash_size(payload: &[u8]) -> Option<SplashSize> {
    match payload {
        [m0, m1, s0, s1, ..] => Some(SplashSize {
            max: u16::from_le_bytes([*m0, *m1]),
            size: u16::from_le_bytes([*s0, *s1]),
        }),
        _ => None,
    }
}

/// Extracts the two pressed key indices. Missing bytes read as 0.
pub fn parse_key_state(payload: &[u8]) -> (u8, u8) {
    (
        payload.first().copied().unwrap_or(0),
        payload.get(1).copied().unwrap_or(0),
    )
}

/// Parses the status byte of a mode switch response.
pub fn parse_exit_status(payload: &[u8]) -> Option<u8> {
    payload.first().copied()
}

/// Builds the LCD reset packet.
pub fn build_reset_packet() -> [u8; 3] {
    [OutReport::LcdReset as u8, 0x01, 0x00]
}

/// Builds the init command for one controller chip.
pub fn build_chip_init_packet(chip: usize) -> [u8; 9] {
    let cs = ((chip << 2) & 0xFF) as u8;
    [
        OutReport::Cmd as u8,
        cs,
        0x02,
        0x00,
        COMMAND_DELAY,
        0x3F,
        0x00,
        COMMAND_DELAY,
        0xC0,
    ]
}

/// Builds a backlight level packet.
pub fn build_backlight_packet(level: u8) -> [u8; 2] {
    [OutReport::LcdBacklight as u8, level]
}

/// Builds a contrast level packet.
pub fn build_contrast_packet(level: u8) -> [u8; 2] {
    [OutReport::LcdContrast as u8, level]
}

/// Builds an LED state packet.
pub fn build_led_packet(mask: u8) -> [u8; 2] {
    [OutReport::LedState as u8, mask]
}

/// Builds a request to leave the current mode, with a little-endian timeout.
pub fn build_exit_mode_packet(exit: HidReport, timeout_ms: u16) -> [u8; 3] {
    let [lo, hi] = timeout_ms.to_le_bytes();
    [exit as u8, lo, hi]
}

/// Builds a single-byte device request.
pub fn build_request_packet(request: HidReport) -> [u8; 1] {
    [request as u8]
}

/// Packs one 64x8 cell of the canvas into its packet pair.
///
/// Bit `b` of each column byte is the pixel at row `line * 8 + b`.
pub fn build_paint_packets(
    canvas: &Canvas,
    chip: usize,
    line: usize,
) -> (
    [u8; PAINT_HEADER_SIZE + HALF_LINE],
    [u8; DATA_HEADER_SIZE + HALF_LINE],
) {
    let cs = ((chip << 2) & 0xFF) as u8;
    let mut first = [0u8; PAINT_HEADER_SIZE + HALF_LINE];
    first[..PAINT_HEADER_SIZE].copy_from_slice(&[
        OutReport::CmdData as u8,
        cs,
        0x02,
        0x00,
        0x00,
        0xB8 | line as u8,
        0x00,
        0x00,
        0x40,
        0x00,
        0x00,
        HALF_LINE as u8,
    ]);

    let mut second = [0u8; DATA_HEADER_SIZE + HALF_LINE];
    second[..DATA_HEADER_SIZE].copy_from_slice(&[
        OutReport::Data as u8,
        cs | 0x01,
        0x00,
        0x00,
        HALF_LINE as u8,
    ]);

    let height = canvas.height().max(1);
    for index in 0..CHIP_WIDTH {
        let x = (chip * CHIP_WIDTH + index) as i32;
        let mut byte = 0u8;
        for bit in 0..LINE_HEIGHT {
            let y = ((line * LINE_HEIGHT + bit) as i32) % height;
            if canvas.get_bit(x, y) {
                byte |= 1 << bit;
            }
        }

        if index < HALF_LINE {
            first[PAINT_HEADER_SIZE + index] = byte;
        } else {
            second[DATA_HEADER_SIZE + index - HALF_LINE] = byte;
        }
    }

    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::decompose_flags;

    #[test]
    fn test_reset_sequence() {
        assert_eq!(build_reset_packet(), [0x93, 0x01, 0x00]);
        assert_eq!(
            build_chip_init_packet(3),
            [0x94, 0x0C, 0x02, 0x00, 0x64, 0x3F, 0x00, 0x64, 0xC0]
        );
    }

    #[test]
    fn test_level_packets() {
        assert_eq!(build_backlight_packet(0x7F), [0x91, 0x7F]);
        assert_eq!(build_contrast_packet(0xE5), [0x92, 0xE5]);
        assert_eq!(build_led_packet(0x05), [0x81, 0x05]);
    }

    #[test]
    fn test_exit_mode_packet() {
        let packet = build_exit_mode_packet(HidReport::ExitKeyboard, 2500);
        assert_eq!(packet, [0xEF, 0xC4, 0x09]);
    }

    #[test]
    fn test_paint_packet_headers() {
        let canvas = Canvas::new(256, 64);
        let (first, second) = build_paint_packets(&canvas, 2, 5);

        assert_eq!(first.len(), 44);
        assert_eq!(
            first[..PAINT_HEADER_SIZE],
            [0x96, 0x08, 0x02, 0x00, 0x00, 0xBD, 0x00, 0x00, 0x40, 0x00, 0x00, 32]
        );
        assert_eq!(second.len(), 37);
        assert_eq!(second[..DATA_HEADER_SIZE], [0x95, 0x09, 0x00, 0x00, 32]);
    }

    #[test]
    fn test_paint_packet_bits() {
        let mut canvas = Canvas::new(256, 64);
        // Chip 1, line 2 covers x 64..128 and y 16..24.
        canvas.set_bit(64, 16, true).unwrap();
        canvas.set_bit(64, 23, true).unwrap();
        canvas.set_bit(64 + 40, 18, true).unwrap();
        canvas.set_bit(0, 16, true).unwrap();

        let (first, second) = build_paint_packets(&canvas, 1, 2);
        assert_eq!(first[PAINT_HEADER_SIZE], 0b1000_0001);
        assert!(first[PAINT_HEADER_SIZE + 1..].iter().all(|&b| b == 0));
        assert_eq!(second[DATA_HEADER_SIZE + 8], 0b0000_0100);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version(&[0x02, 0x01]),
            Some(Version { major: 1, minor: 2 })
        );
        assert_eq!(parse_version(&[0x02]), None);
        assert_eq!(Version { major: 1, minor: 2 }.to_string(), "1.2");
    }

    #[test]
    fn test_parse_splash_size() {
        assert_eq!(
            parse_splash_size(&[0x00, 0x10, 0x34, 0x12]),
            Some(SplashSize {
                size: 0x1234,
                max: 0x1000
            })
        );
        assert_eq!(parse_splash_size(&[0x00, 0x10, 0x34]), None);
    }

    #[test]
    fn test_parse_key_state() {
        assert_eq!(parse_key_state(&[3, 5]), (3, 5));
        assert_eq!(parse_key_state(&[3]), (3, 0));
        assert_eq!(parse_key_state(&[]), (0, 0));
    }

    #[test]
    fn test_code_lookup() {
        assert_eq!(InReport::from_byte(0x11), Some(InReport::KeyState));
        assert_eq!(HidReport::from_byte(0xEF), Some(HidReport::ExitKeyboard));
        assert_eq!(Status::from_byte(0x42), None);
        assert_eq!(FlashType::CodeSplash.to_string(), "CODE_SPLASH");
        assert_eq!(report_name(0x21), "IR_DATA");
        assert_eq!(report_name(0xF6), "GET_MAX_STX_SIZE");
        assert_eq!(report_name(0x77), "UNKNOWN");
    }

    #[test]
    fn test_decompose_status() {
        let result = decompose_flags::<Status>(0x13);
        assert_eq!(result.flags, vec![Status::Disconnected]);
        assert_eq!(result.remainder, 0);

        // `Ok` is zero and is never listed.
        assert!(decompose_flags::<Status>(0x00).flags.is_empty());

        let result = decompose_flags::<RequestResult>(0x07);
        assert_eq!(
            result.flags,
            vec![RequestResult::SectionOverflow, RequestResult::ParamMissing]
        );
        assert_eq!(result.remainder, 0);
    }
}

//! Device session: open/close lifecycle, report dispatch and mode switching.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use super::config::SessionConfig;
use super::keys::{KeyEvent, KeyTable};
use super::mode::Mode;
use super::protocol::{
    build_backlight_packet, build_chip_init_packet, build_contrast_packet, build_exit_mode_packet,
    build_led_packet, build_paint_packets, build_request_packet, build_reset_packet,
    parse_exit_status, parse_key_state, parse_splash_size, parse_version, report_name,
    FlashReport, FlashType, HidReport, InReport, KeyboardReport, OutReport, SplashSize, Status,
    Version, CHIP_COUNT, CHIP_WIDTH, LINE_COUNT, LINE_HEIGHT, REPORT_SIZE,
};
use super::transport::{DeviceInfo, Transport, TransportHandle};
use super::{PRODUCT_ID, SCREEN_H, SCREEN_W, VENDOR_ID};
use crate::canvas::Canvas;
use crate::error_log::{ErrorEntry, ErrorLog};
use crate::{Error, Result};

/// Error code recorded for payloads that are too short.
const SHORT_PAYLOAD: u32 = 2;

type InputHandler<T> = fn(&mut PicoLcd<T>, u8, &[u8]);
type Hook<T> = fn(&mut PicoLcd<T>) -> Result<()>;

/// Handlers and hooks installed at construction.
struct Registry<T: Transport> {
    input: HashMap<u8, InputHandler<T>>,
    poll: Vec<Hook<T>>,
    reset: Vec<Hook<T>>,
}

/// Feature groups a session is assembled from.
#[derive(Debug, Clone, Copy)]
enum Extension {
    Display,
    Keys,
    Ir,
    Mode,
    Version,
    Splash,
}

const EXTENSIONS: [Extension; 6] = [
    Extension::Display,
    Extension::Keys,
    Extension::Ir,
    Extension::Mode,
    Extension::Version,
    Extension::Splash,
];

impl Extension {
    fn install<T: Transport>(self, registry: &mut Registry<T>) {
        match self {
            Extension::Display => {
                registry.poll.push(|lcd| lcd.paint(false));
                registry.reset.push(PicoLcd::reset_display);
            }
            Extension::Keys => {
                registry
                    .input
                    .insert(InReport::KeyState as u8, PicoLcd::handle_key_state);
            }
            Extension::Ir => {
                registry
                    .input
                    .insert(InReport::IrData as u8, PicoLcd::handle_ir_data);
            }
            Extension::Mode => {
                registry
                    .input
                    .insert(HidReport::ExitFlasher as u8, PicoLcd::handle_exit_status);
                registry
                    .input
                    .insert(HidReport::ExitKeyboard as u8, PicoLcd::handle_exit_status);
            }
            Extension::Version => {
                registry
                    .input
                    .insert(HidReport::GetVersion1 as u8, PicoLcd::handle_version);
            }
            Extension::Splash => {
                registry
                    .input
                    .insert(HidReport::GetMaxStxSize as u8, PicoLcd::handle_splash_size);
            }
        }
    }
}

/// A picoLCD 256x64 session.
///
/// The session is driven by the host: call [`PicoLcd::poll`] repeatedly to
/// dispatch inbound reports and push canvas changes to the panel.
pub struct PicoLcd<T: Transport> {
    transport: Arc<T>,
    info: DeviceInfo,
    config: SessionConfig,
    handle: Option<T::Handle>,
    canvas: Canvas,
    keys: KeyTable,
    mode: Mode,
    version: Option<Version>,
    splash: Option<SplashSize>,
    errors: ErrorLog,
    on_key_down: Option<Box<dyn FnMut(u8)>>,
    on_key_up: Option<Box<dyn FnMut(u8)>>,
    on_ir_data: Option<Box<dyn FnMut(&[u8])>>,
    registry: Registry<T>,
}

impl<T: Transport> PicoLcd<T> {
    /// Creates a session for every attached panel, in enumeration order.
    pub fn devices(transport: &Arc<T>, config: &SessionConfig) -> Result<Vec<Self>> {
        let devices = transport.enumerate(VENDOR_ID, PRODUCT_ID)?;
        Ok(devices
            .into_iter()
            .map(|info| Self::new(transport.clone(), info, config.clone()))
            .collect())
    }

    /// Creates a closed session for one device.
    pub fn new(transport: Arc<T>, info: DeviceInfo, config: SessionConfig) -> Self {
        let mut registry = Registry {
            input: HashMap::new(),
            poll: Vec::new(),
            reset: Vec::new(),
        };
        for extension in EXTENSIONS {
            extension.install(&mut registry);
        }

        Self {
            transport,
            info,
            config,
            handle: None,
            canvas: Canvas::new(SCREEN_W, SCREEN_H),
            keys: KeyTable::new(),
            mode: Mode::default(),
            version: None,
            splash: None,
            errors: ErrorLog::new(),
            on_key_down: None,
            on_key_up: None,
            on_ir_data: None,
            registry,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Opens the device and resets the panel.
    ///
    /// If the reset fails the handle is closed again and the error returned.
    pub fn open(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(Error::AlreadyOpen);
        }

        self.handle = Some(self.transport.open(&self.info.path)?);
        if let Err(e) = self.initialize() {
            self.close();
            return Err(e);
        }

        info!("picoLCD opened at {}", self.info.path);
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        self.handle_mut()?.set_nonblocking(true)?;
        self.reset()
    }

    /// Releases the handle. Safe to call on a closed session.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close() {
                debug!("Ignoring close failure: {}", e);
            }
            info!("picoLCD closed at {}", self.info.path);
        }
    }

    /// Resets the controller chips, then runs the reset hooks.
    pub fn reset(&mut self) -> Result<()> {
        self.write(&build_reset_packet())?;
        for chip in 0..CHIP_COUNT {
            self.write(&build_chip_init_packet(chip))?;
        }

        for hook in self.registry.reset.clone() {
            hook(self)?;
        }
        debug!("Reset completed");
        Ok(())
    }

    /// Processes at most one pending report, then runs the poll hooks.
    pub fn poll(&mut self) -> Result<()> {
        self.process_input()?;
        for hook in self.registry.poll.clone() {
            hook(self)?;
        }
        Ok(())
    }

    /// Reads one pending report and dispatches it by its type byte.
    ///
    /// Returns whether a report was handled.
    pub fn process_input(&mut self) -> Result<bool> {
        let Some(report) = self.handle_mut()?.read(REPORT_SIZE)? else {
            return Ok(false);
        };
        let Some((&kind, payload)) = report.split_first() else {
            return Ok(false);
        };

        let handler = self
            .registry
            .input
            .get(&kind)
            .copied()
            .unwrap_or(Self::handle_unknown);
        handler(self, kind, payload);
        Ok(true)
    }

    /// Sends changed 64x8 cells to the panel, or every cell when forced.
    pub fn paint(&mut self, force: bool) -> Result<()> {
        if !force && !self.canvas.is_dirty() {
            return Ok(());
        }

        let mut sent = 0;
        for chip in 0..CHIP_COUNT {
            for line in 0..LINE_COUNT {
                let x = (chip * CHIP_WIDTH) as i32;
                let y = (line * LINE_HEIGHT) as i32;
                if !force
                    && !self
                        .canvas
                        .is_dirty_rect(x, y, CHIP_WIDTH as i32, LINE_HEIGHT as i32)?
                {
                    continue;
                }

                let (first, second) = build_paint_packets(&self.canvas, chip, line);
                self.write(&first)?;
                self.write(&second)?;
                sent += 1;
            }
        }

        self.canvas.flush();
        debug!("Painted {} of {} cells", sent, CHIP_COUNT * LINE_COUNT);
        Ok(())
    }

    /// Leaves the current mode and waits for the device to confirm.
    ///
    /// Fails with `Error::Timeout` once the configured deadline passes. On
    /// any failure while waiting the mode is left unknown.
    pub fn switch_mode(&mut self) -> Result<Mode> {
        self.handle_mut()?;
        let target = self.mode.opposite();
        let exit = match target {
            Mode::Flasher => HidReport::ExitKeyboard,
            _ => HidReport::ExitFlasher,
        };
        let timeout = self.config.mode_switch_timeout();
        let timeout_ms = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);

        self.write(&build_exit_mode_packet(exit, timeout_ms))?;
        self.mode = Mode::Switching;
        info!("Switching to {} mode", target);

        let deadline = Instant::now() + timeout;
        while self.mode == Mode::Switching {
            thread::sleep(self.config.poll_interval());
            if let Err(e) = self.poll() {
                self.mode = Mode::Unknown;
                return Err(e);
            }
            if self.mode == Mode::Switching && Instant::now() >= deadline {
                self.mode = Mode::Unknown;
                return Err(Error::Timeout(timeout));
            }
        }

        info!("Now in {} mode", self.mode);
        Ok(self.mode)
    }

    pub fn set_backlight(&mut self, level: u8) -> Result<()> {
        self.write(&build_backlight_packet(level))?;
        debug!("Set backlight to {}", level);
        Ok(())
    }

    pub fn set_contrast(&mut self, level: u8) -> Result<()> {
        self.write(&build_contrast_packet(level))?;
        debug!("Set contrast to {}", level);
        Ok(())
    }

    /// Sets the LED outputs from a bit mask.
    pub fn set_led_state(&mut self, mask: u8) -> Result<()> {
        self.write(&build_led_packet(mask))?;
        debug!("Set LED state to {:#04x}", mask);
        Ok(())
    }

    /// Registers the key press callback, replacing any previous one.
    pub fn on_key_down(&mut self, callback: impl FnMut(u8) + 'static) -> &mut Self {
        self.on_key_down = Some(Box::new(callback));
        self
    }

    /// Registers the key release callback, replacing any previous one.
    pub fn on_key_up(&mut self, callback: impl FnMut(u8) + 'static) -> &mut Self {
        self.on_key_up = Some(Box::new(callback));
        self
    }

    /// Registers the IR data callback, replacing any previous one.
    pub fn on_ir_data(&mut self, callback: impl FnMut(&[u8]) + 'static) -> &mut Self {
        self.on_ir_data = Some(Box::new(callback));
        self
    }

    /// Whether a key is currently held. Key 0 is never pressed.
    pub fn key_state(&self, key: u8) -> bool {
        self.keys.is_pressed(key)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_flasher(&self) -> bool {
        self.mode == Mode::Flasher
    }

    /// Asks for the firmware version. The answer arrives through `poll`.
    pub fn request_version(&mut self) -> Result<()> {
        self.version = None;
        self.write(&build_request_packet(HidReport::GetVersion1))
    }

    /// Last reported firmware version.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Asks for the splash storage size. The answer arrives through `poll`.
    pub fn request_splash_size(&mut self) -> Result<()> {
        self.splash = None;
        self.write(&build_request_packet(HidReport::GetMaxStxSize))
    }

    /// Last reported splash storage size.
    pub fn splash_size(&self) -> Option<SplashSize> {
        self.splash
    }

    /// Report code for writing a memory region, available in flasher mode only.
    pub fn flash_write_report(&self, kind: FlashType) -> Option<u8> {
        if !self.is_flasher() {
            return None;
        }
        Some(match kind {
            FlashType::CodeMemory => FlashReport::WriteMemory as u8,
            FlashType::CodeSplash => KeyboardReport::WriteMemory as u8,
            FlashType::EpromExternal => OutReport::ExtEepromWrite as u8,
            FlashType::EpromInternal => OutReport::IntEepromWrite as u8,
        })
    }

    /// Report code for reading a memory region, available in flasher mode only.
    pub fn flash_read_report(&self, kind: FlashType) -> Option<u8> {
        if !self.is_flasher() {
            return None;
        }
        Some(match kind {
            FlashType::CodeMemory => FlashReport::ReadMemory as u8,
            FlashType::CodeSplash => KeyboardReport::ReadMemory as u8,
            FlashType::EpromExternal => OutReport::ExtEepromRead as u8,
            FlashType::EpromInternal => OutReport::IntEepromRead as u8,
        })
    }

    /// Recently recorded inbound errors, oldest first.
    pub fn error_history(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.errors.entries()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    fn handle_mut(&mut self) -> Result<&mut T::Handle> {
        self.handle.as_mut().ok_or(Error::NotOpen)
    }

    fn write(&mut self, report: &[u8]) -> Result<()> {
        self.handle_mut()?.write(report)
    }

    fn reset_display(&mut self) -> Result<()> {
        self.canvas.clear(false);
        self.paint(true)?;
        self.set_contrast(self.config.contrast)?;
        self.set_backlight(self.config.backlight)
    }

    fn handle_unknown(&mut self, kind: u8, payload: &[u8]) {
        debug!(
            "No handler for report {:#04x} ({}) with {} bytes",
            kind,
            report_name(kind),
            payload.len()
        );
    }

    fn handle_key_state(&mut self, _kind: u8, payload: &[u8]) {
        if payload.len() < 2 {
            self.errors
                .record(SHORT_PAYLOAD, "not enough data for IN_REPORT.KEY_STATE");
        }
        let (key1, key2) = parse_key_state(payload);
        debug!("Pressed keys: {} {}", key1, key2);

        for event in self.keys.update(key1, key2) {
            match event {
                KeyEvent::Down(key) => {
                    if let Some(callback) = self.on_key_down.as_mut() {
                        callback(key);
                    }
                }
                KeyEvent::Up(key) => {
                    if let Some(callback) = self.on_key_up.as_mut() {
                        callback(key);
                    }
                }
            }
        }
    }

    fn handle_ir_data(&mut self, _kind: u8, payload: &[u8]) {
        debug!("IR data: {:02x?}", payload);
        if let Some(callback) = self.on_ir_data.as_mut() {
            callback(payload);
        }
    }

    fn handle_exit_status(&mut self, kind: u8, payload: &[u8]) {
        if self.mode != Mode::Switching {
            debug!("Ignoring unsolicited {} response", report_name(kind));
            return;
        }

        let reached = if kind == HidReport::ExitKeyboard as u8 {
            Mode::Flasher
        } else {
            Mode::Keyboard
        };

        match parse_exit_status(payload) {
            Some(0) => {
                self.mode = reached;
                debug!("Switched to {} mode", reached);
            }
            status => {
                self.mode = Mode::Unknown;
                let code = status.unwrap_or(Status::Error as u8);
                let status_name = Status::from_byte(code).map_or("UNKNOWN", Status::name);
                self.errors.record(
                    u32::from(code),
                    format!("HID_REPORT.{} failed ({status_name})", report_name(kind)),
                );
            }
        }
    }

    fn handle_version(&mut self, kind: u8, payload: &[u8]) {
        let version = parse_version(payload).unwrap_or_else(|| {
            self.errors.record(
                SHORT_PAYLOAD,
                format!("not enough data for HID_REPORT.{}", report_name(kind)),
            );
            Version::default()
        });
        debug!("Firmware version {}", version);
        self.version = Some(version);
    }

    fn handle_splash_size(&mut self, kind: u8, payload: &[u8]) {
        let splash = parse_splash_size(payload).unwrap_or_else(|| {
            self.errors.record(
                SHORT_PAYLOAD,
                format!("not enough data for HID_REPORT.{}", report_name(kind)),
            );
            SplashSize::default()
        });
        debug!("Splash size={}, max={}", splash.size, splash.max);
        self.splash = Some(splash);
    }
}

impl<T: Transport> Drop for PicoLcd<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockTransport;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn session() -> (MockTransport, PicoLcd<MockTransport>) {
        session_with(SessionConfig::default())
    }

    fn session_with(config: SessionConfig) -> (MockTransport, PicoLcd<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let mut lcd = PicoLcd::devices(&transport, &config).unwrap().remove(0);
        lcd.open().unwrap();
        transport.take_written();
        ((*transport).clone(), lcd)
    }

    #[test]
    fn test_devices() {
        let transport = Arc::new(MockTransport::default());
        let devices = PicoLcd::devices(&transport, &SessionConfig::default()).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].info().path, "mock:0");
        assert!(!devices[0].is_open());
        assert_eq!(devices[0].mode(), Mode::Keyboard);
    }

    #[test]
    fn test_open_sequence() {
        let transport = Arc::new(MockTransport::default());
        let mut lcd = PicoLcd::devices(&transport, &SessionConfig::default())
            .unwrap()
            .remove(0);
        lcd.open().unwrap();

        let written = transport.take_written();
        assert_eq!(written[0], build_reset_packet());
        for chip in 0..CHIP_COUNT {
            assert_eq!(written[1 + chip], build_chip_init_packet(chip));
        }
        // Every cell is painted after the reset.
        let paint = &written[5..5 + 2 * CHIP_COUNT * LINE_COUNT];
        assert!(paint.iter().step_by(2).all(|p| p.len() == 44 && p[0] == 0x96));
        assert!(paint.iter().skip(1).step_by(2).all(|p| p.len() == 37 && p[0] == 0x95));
        assert_eq!(written[69..], [vec![0x92, 0xE5], vec![0x91, 0x7F]]);
        assert_eq!(written.len(), 71);

        assert!(transport.state().nonblocking);
        assert!(!lcd.canvas().is_dirty());
    }

    #[test]
    fn test_open_close_lifecycle() {
        let (transport, mut lcd) = session();
        assert!(lcd.is_open());
        assert!(matches!(lcd.open(), Err(Error::AlreadyOpen)));

        lcd.close();
        lcd.close();
        assert!(!lcd.is_open());
        assert_eq!(transport.state().closed, 1);
        assert!(matches!(lcd.set_backlight(1), Err(Error::NotOpen)));

        lcd.open().unwrap();
        assert!(lcd.is_open());
        assert_eq!(transport.state().opened, 2);
    }

    #[test]
    fn test_close_failure_swallowed() {
        let (transport, mut lcd) = session();
        transport.state().fail_close = true;
        lcd.close();
        assert!(!lcd.is_open());
    }

    #[test]
    fn test_open_failures() {
        let transport = Arc::new(MockTransport::default());
        let mut lcd = PicoLcd::devices(&transport, &SessionConfig::default())
            .unwrap()
            .remove(0);

        transport.state().fail_open = true;
        assert!(matches!(lcd.open(), Err(Error::OpenFailed { .. })));
        assert!(!lcd.is_open());

        transport.state().fail_open = false;
        transport.state().fail_write = true;
        transport.state().fail_close = true;
        assert!(matches!(lcd.open(), Err(Error::Transport(_))));
        assert!(!lcd.is_open());
        assert_eq!(transport.state().closed, 1);
    }

    #[test]
    fn test_paint_skips_clean_cells() {
        let (transport, mut lcd) = session();

        lcd.paint(false).unwrap();
        assert!(transport.take_written().is_empty());

        // x 70 is chip 1, y 20 is line 2.
        lcd.canvas_mut().set_bit(70, 20, true).unwrap();
        lcd.paint(false).unwrap();
        let written = transport.take_written();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0][1], 0x04);
        assert_eq!(written[0][5], 0xBA);
        assert_eq!(written[0][12 + 6], 0b0001_0000);
        assert_eq!(written[1][1], 0x05);

        lcd.paint(true).unwrap();
        assert_eq!(transport.take_written().len(), 64);
    }

    #[test]
    fn test_poll_paints() {
        let (transport, mut lcd) = session();
        lcd.canvas_mut().fill_rect(0, 0, 256, 8, true).unwrap();
        lcd.poll().unwrap();
        assert_eq!(transport.take_written().len(), 8);
        assert!(!lcd.canvas().is_dirty());
    }

    #[test]
    fn test_key_edges() {
        let (transport, mut lcd) = session();
        let events = Rc::new(RefCell::new(Vec::new()));

        let down = events.clone();
        let up = events.clone();
        lcd.on_key_down(move |key| down.borrow_mut().push(KeyEvent::Down(key)))
            .on_key_up(move |key| up.borrow_mut().push(KeyEvent::Up(key)));

        transport.queue(&[0x11, 3, 0]);
        transport.queue(&[0x11, 3, 0]);
        transport.queue(&[0x11]);
        for _ in 0..3 {
            assert!(lcd.process_input().unwrap());
        }
        assert!(!lcd.process_input().unwrap());

        assert_eq!(*events.borrow(), vec![KeyEvent::Down(3), KeyEvent::Up(3)]);
        assert!(!lcd.key_state(3));
        // The empty payload was short and got logged.
        assert_eq!(lcd.error_history().count(), 1);
    }

    #[test]
    fn test_key_state_query() {
        let (transport, mut lcd) = session();
        transport.queue(&[0x11, 1, 4]);
        lcd.poll().unwrap();
        assert!(lcd.key_state(1) && lcd.key_state(4));
        assert!(!lcd.key_state(0) && !lcd.key_state(2) && !lcd.key_state(9));
    }

    #[test]
    fn test_ir_forwarded() {
        let (transport, mut lcd) = session();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        lcd.on_ir_data(move |data| sink.borrow_mut().extend_from_slice(data));

        transport.queue(&[0x21, 0xDE, 0xAD, 0xBE, 0xEF]);
        lcd.poll().unwrap();
        assert_eq!(*received.borrow(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_unknown_report_ignored() {
        let (transport, mut lcd) = session();
        transport.queue(&[0x01, 0x00]);
        assert!(lcd.process_input().unwrap());
        assert_eq!(lcd.error_history().count(), 0);
    }

    #[test]
    fn test_version() {
        let (transport, mut lcd) = session();
        lcd.request_version().unwrap();
        assert_eq!(transport.take_written(), vec![vec![0xF1]]);
        assert_eq!(lcd.version(), None);

        transport.queue(&[0xF1, 0x05, 0x01]);
        lcd.poll().unwrap();
        assert_eq!(lcd.version(), Some(Version { major: 1, minor: 5 }));
    }

    #[test]
    fn test_short_version_zeroed() {
        let (transport, mut lcd) = session();
        transport.queue(&[0xF1, 0x05]);
        lcd.poll().unwrap();
        assert_eq!(lcd.version(), Some(Version { major: 0, minor: 0 }));

        let entry = lcd.error_history().last().unwrap();
        assert_eq!(entry.code, 2);
        assert!(entry.message.contains("GET_VERSION_1"));
    }

    #[test]
    fn test_splash_size() {
        let (transport, mut lcd) = session();
        lcd.request_splash_size().unwrap();
        assert_eq!(transport.take_written(), vec![vec![0xF6]]);

        transport.queue(&[0xF6, 0x00, 0x20, 0x10, 0x00]);
        lcd.poll().unwrap();
        assert_eq!(
            lcd.splash_size(),
            Some(SplashSize {
                size: 0x10,
                max: 0x2000
            })
        );

        transport.queue(&[0xF6, 0x00]);
        lcd.poll().unwrap();
        assert_eq!(lcd.splash_size(), Some(SplashSize::default()));
    }

    #[test]
    fn test_switch_mode() {
        let (transport, mut lcd) = session();
        transport.queue(&[0xEF, 0x00]);
        assert_eq!(lcd.switch_mode().unwrap(), Mode::Flasher);
        assert!(lcd.is_flasher());
        assert_eq!(transport.take_written()[0], vec![0xEF, 0xC4, 0x09]);

        transport.queue(&[0xFF, 0x00]);
        assert_eq!(lcd.switch_mode().unwrap(), Mode::Keyboard);
        assert_eq!(transport.take_written()[0][0], 0xFF);
    }

    #[test]
    fn test_switch_mode_failure_status() {
        let (transport, mut lcd) = session();
        transport.queue(&[0xEF, 0xFF]);
        assert_eq!(lcd.switch_mode().unwrap(), Mode::Unknown);
        assert_eq!(lcd.error_history().last().unwrap().code, 0xFF);
    }

    #[test]
    fn test_switch_mode_timeout() {
        let config = SessionConfig {
            mode_switch_timeout_ms: 60,
            poll_interval_ms: 5,
            ..Default::default()
        };
        let (transport, mut lcd) = session_with(config);
        // A response for the wrong request arrives while waiting.
        transport.queue(&[0xF1, 0x01, 0x02]);

        let started = Instant::now();
        let result = lcd.switch_mode();
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(lcd.mode(), Mode::Unknown);
    }

    #[test]
    fn test_switch_mode_poll_failure() {
        let (transport, mut lcd) = session();
        lcd.canvas_mut().set_bit(0, 0, true).unwrap();

        let failing = transport.clone();
        lcd.on_key_down(move |_| failing.state().fail_write = true);
        transport.queue(&[0x11, 1, 0]);

        // The key press breaks the paint that follows it.
        assert!(matches!(lcd.switch_mode(), Err(Error::Transport(_))));
        assert_eq!(lcd.mode(), Mode::Unknown);
        assert!(!lcd.is_flasher());

        transport.state().fail_write = false;
        transport.queue(&[0xEF, 0x00]);
        lcd.poll().unwrap();
        assert_eq!(lcd.mode(), Mode::Unknown);
    }

    #[test]
    fn test_unsolicited_exit_ignored() {
        let (transport, mut lcd) = session();
        transport.queue(&[0xEF, 0x00]);
        lcd.poll().unwrap();
        assert_eq!(lcd.mode(), Mode::Keyboard);
    }

    #[test]
    fn test_flash_reports() {
        let (transport, mut lcd) = session();
        assert_eq!(lcd.flash_write_report(FlashType::CodeMemory), None);

        transport.queue(&[0xEF, 0x00]);
        lcd.switch_mode().unwrap();
        assert_eq!(lcd.flash_write_report(FlashType::CodeMemory), Some(0xF4));
        assert_eq!(lcd.flash_write_report(FlashType::CodeSplash), Some(0xB4));
        assert_eq!(lcd.flash_write_report(FlashType::EpromExternal), Some(0xA2));
        assert_eq!(lcd.flash_write_report(FlashType::EpromInternal), Some(0xA4));
        assert_eq!(lcd.flash_read_report(FlashType::CodeMemory), Some(0xF3));
        assert_eq!(lcd.flash_read_report(FlashType::CodeSplash), Some(0xB3));
        assert_eq!(lcd.flash_read_report(FlashType::EpromExternal), Some(0xA1));
        assert_eq!(lcd.flash_read_report(FlashType::EpromInternal), Some(0xA3));
    }

    #[test]
    fn test_levels_and_led() {
        let (transport, mut lcd) = session();
        lcd.set_backlight(0x10).unwrap();
        lcd.set_contrast(0x20).unwrap();
        lcd.set_led_state(0x03).unwrap();
        assert_eq!(
            transport.take_written(),
            vec![vec![0x91, 0x10], vec![0x92, 0x20], vec![0x81, 0x03]]
        );
    }
}

//! picoLCD Control Tool
//!
//! CLI for driving picoLCD 256x64 graphic panels directly over USB HID.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use picolcd_hw::device::protocol::{HidReport, InReport, OutReport, RequestResult, Status};
use picolcd_hw::{
    decompose_flags, Align, FlagSet, Font, HidTransport, PicoLcd, TextBoxStyle, TextStyle,
    Transport, SCREEN_H, SCREEN_W,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

/// How long to wait for a response to a device request.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum CliAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl From<CliAlign> for Align {
    fn from(align: CliAlign) -> Self {
        match align {
            CliAlign::Left => Align::Left,
            CliAlign::Center => Align::Center,
            CliAlign::Right => Align::Right,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CodeTable {
    /// Device status codes
    Status,
    /// Flash request results
    Result,
    /// Inbound report types
    InReport,
    /// Outbound report types
    OutReport,
    /// Device request codes
    HidReport,
}

#[derive(Parser)]
#[command(name = "picolcdctl")]
#[command(about = "Control tool for picoLCD 256x64 graphic panels")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file
    #[arg(short, long, default_value = "picolcd.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached panels
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Draw word-wrapped text across the screen
    Text {
        /// Text to draw; "\n" starts a new line
        text: String,

        /// Use the bold font
        #[arg(long)]
        bold: bool,

        /// Horizontal alignment
        #[arg(long, default_value = "left", value_enum)]
        align: CliAlign,

        /// Draw a border around the screen
        #[arg(long)]
        border: bool,

        /// Light text on a dark background
        #[arg(long)]
        invert: bool,
    },
    /// Clear the screen
    Clear {
        /// Turn every pixel on instead of off
        #[arg(long)]
        fill: bool,
    },
    /// Set the backlight level
    Backlight {
        /// Level (0-255)
        level: u8,
    },
    /// Set the contrast level
    Contrast {
        /// Level (0-255)
        level: u8,
    },
    /// Set the LED outputs
    Led {
        /// Bit mask, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        mask: u8,
    },
    /// Print key and IR events until interrupted
    Watch,
    /// Show firmware version and splash storage
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle between keyboard and flasher mode
    SwitchMode,
    /// Decode a protocol code into named flags
    Decode {
        /// Code table to match against
        #[arg(value_enum)]
        table: CodeTable,

        /// Value, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        value: u8,
    },
    /// Font tools
    Font {
        #[command(subcommand)]
        action: FontCommands,
    },
}

#[derive(Subcommand)]
enum FontCommands {
    /// Write a font as a loadable TOML description
    Dump {
        /// Dump the bold font
        #[arg(long)]
        bold: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show how text is laid out
    Measure {
        text: String,

        /// Wrap width in pixels
        #[arg(long)]
        width: Option<usize>,

        /// Use the bold font
        #[arg(long)]
        bold: bool,
    },
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte '{}': {}", s, e))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(&cli.config).context("Failed to load configuration")?;

    match cli.command {
        Commands::List { json } => handle_list(json),
        Commands::Text {
            text,
            bold,
            align,
            border,
            invert,
        } => {
            let style = TextBoxStyle {
                text: TextStyle {
                    bold,
                    bit: !invert,
                    ..Default::default()
                },
                align: align.into(),
                border,
                fill: true,
            };
            handle_text(&config, &text.replace("\\n", "\n"), style)
        }
        Commands::Clear { fill } => {
            let mut lcd = open_device(&config)?;
            lcd.canvas_mut().clear(fill);
            lcd.paint(false)?;
            println!("Screen cleared");
            Ok(())
        }
        Commands::Backlight { level } => {
            open_device(&config)?.set_backlight(level)?;
            println!("Backlight set to: {}", level);
            Ok(())
        }
        Commands::Contrast { level } => {
            open_device(&config)?.set_contrast(level)?;
            println!("Contrast set to: {}", level);
            Ok(())
        }
        Commands::Led { mask } => {
            open_device(&config)?.set_led_state(mask)?;
            println!("LED state set to: {:#04x}", mask);
            Ok(())
        }
        Commands::Watch => handle_watch(&config).await,
        Commands::Info { json } => handle_info(&config, json).await,
        Commands::SwitchMode => {
            let mut lcd = open_device(&config)?;
            let mode = lcd.switch_mode().context("Mode switch failed")?;
            println!("Device is now in {} mode", mode);
            Ok(())
        }
        Commands::Decode { table, value } => {
            handle_decode(table, value);
            Ok(())
        }
        Commands::Font { action } => handle_font(action),
    }
}

fn open_device(config: &Config) -> Result<PicoLcd<HidTransport>> {
    let transport = Arc::new(HidTransport::new().context("Failed to initialize HID")?);
    let mut devices = PicoLcd::devices(&transport, &config.session)?;

    let index = match config.device_path() {
        Some(path) => devices
            .iter()
            .position(|d| d.info().path == path)
            .with_context(|| format!("No picoLCD at {}", path))?,
        None if devices.is_empty() => anyhow::bail!("No picoLCD found"),
        None => 0,
    };

    let mut lcd = devices.swap_remove(index);
    lcd.canvas_mut().set_fonts(config.font_set()?);
    lcd.open()
        .with_context(|| format!("Failed to open picoLCD at {}", lcd.info().path))?;
    Ok(lcd)
}

fn handle_list(json: bool) -> Result<()> {
    let transport = HidTransport::new().context("Failed to initialize HID")?;
    let devices = transport.enumerate(picolcd_hw::VENDOR_ID, picolcd_hw::PRODUCT_ID)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No picoLCD devices found");
    }
    for device in devices {
        println!("{}", device.path);
        println!(
            "  Manufacturer: {}",
            device.manufacturer.as_deref().unwrap_or("-")
        );
        println!("  Product: {}", device.product.as_deref().unwrap_or("-"));
        println!("  Serial: {}", device.serial_number.as_deref().unwrap_or("-"));
    }
    Ok(())
}

fn handle_text(config: &Config, text: &str, style: TextBoxStyle) -> Result<()> {
    let mut lcd = open_device(config)?;
    lcd.canvas_mut()
        .draw_text_box(text, 0, 0, SCREEN_W, SCREEN_H, style)?;
    lcd.paint(false)?;
    println!("Text drawn");
    Ok(())
}

async fn handle_watch(config: &Config) -> Result<()> {
    let mut lcd = open_device(config)?;
    lcd.on_key_down(|key| info!("Key {} down", key))
        .on_key_up(|key| info!("Key {} up", key))
        .on_ir_data(|data| info!("IR data: {:02x?}", data));

    let mut interval = tokio::time::interval(Duration::from_millis(config.poll_interval_ms.max(1)));
    info!("Watching {} (Ctrl+C to stop)", lcd.info().path);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                lcd.poll()?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing device");
                break;
            }
        }
    }

    lcd.close();
    Ok(())
}

/// Polls until `probe` yields a value or the response timeout passes.
async fn wait_for<T, F>(lcd: &mut PicoLcd<HidTransport>, interval: Duration, probe: F) -> Result<T>
where
    F: Fn(&PicoLcd<HidTransport>) -> Option<T>,
{
    let started = Instant::now();
    loop {
        lcd.poll()?;
        if let Some(value) = probe(&*lcd) {
            return Ok(value);
        }
        if started.elapsed() >= RESPONSE_TIMEOUT {
            anyhow::bail!("No response from device within {:?}", RESPONSE_TIMEOUT);
        }
        tokio::time::sleep(interval).await;
    }
}

async fn handle_info(config: &Config, json: bool) -> Result<()> {
    let mut lcd = open_device(config)?;
    let interval = config.session.poll_interval();

    lcd.request_version()?;
    let version = wait_for(&mut lcd, interval, |lcd| lcd.version())
        .await
        .context("Failed to read firmware version")?;
    lcd.request_splash_size()?;
    let splash = wait_for(&mut lcd, interval, |lcd| lcd.splash_size())
        .await
        .context("Failed to read splash size")?;

    if json {
        let value = serde_json::json!({
            "device": lcd.info(),
            "mode": lcd.mode(),
            "version": version,
            "splash": splash,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("picoLCD Status:");
    println!("  Path: {}", lcd.info().path);
    println!("  Mode: {}", lcd.mode());
    println!("  Firmware: {}", version);
    println!("  Splash storage: {} of {} bytes", splash.size, splash.max);

    let errors: Vec<_> = lcd.error_history().collect();
    if !errors.is_empty() {
        println!("  Recorded errors:");
        for entry in errors {
            println!("    ({:#04x}) {}", entry.code, entry.message);
        }
    }
    Ok(())
}

fn print_decoded<T: FlagSet + std::fmt::Display>(value: u8) {
    let decoded = decompose_flags::<T>(u32::from(value));
    let names: Vec<String> = decoded.flags.iter().map(ToString::to_string).collect();
    if names.is_empty() {
        println!("{:#04x}: no matching codes", value);
    } else {
        println!("{:#04x}: {}", value, names.join(" | "));
    }
    if decoded.remainder != 0 {
        println!("  unmatched bits: {:#04x}", decoded.remainder);
    }
}

fn handle_decode(table: CodeTable, value: u8) {
    match table {
        CodeTable::Status => print_decoded::<Status>(value),
        CodeTable::Result => print_decoded::<RequestResult>(value),
        CodeTable::InReport => print_decoded::<InReport>(value),
        CodeTable::OutReport => print_decoded::<OutReport>(value),
        CodeTable::HidReport => print_decoded::<HidReport>(value),
    }
}

fn handle_font(action: FontCommands) -> Result<()> {
    match action {
        FontCommands::Dump { bold, output } => {
            let font = if bold { Font::bold() } else { Font::regular() };
            let content = toml::to_string_pretty(&font.to_description())
                .context("Failed to serialize font")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, content).context("Failed to write font file")?;
                    println!("{} written to: {}", font, path.display());
                }
                None => print!("{}", content),
            }
        }
        FontCommands::Measure { text, width, bold } => {
            let font = if bold { Font::bold() } else { Font::regular() };
            let measurement = font.measure(&text.replace("\\n", "\n"), width);
            println!("Font: {}", font);
            println!("Size: {}x{}", measurement.width, measurement.height);
            for line in &measurement.lines {
                println!("  |{}|", line);
            }
        }
    }

    Ok(())
}

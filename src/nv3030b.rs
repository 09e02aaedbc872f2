// Minimal NV3030B TFT panel driver (4-wire SPI with a D/C line).
// Works with any embedded-hal 1.0 bus and embedded-graphics.
//
// Wiring:
//   SCK/MOSI/CS = SPI bus, CS is handled by the `SpiDevice` implementation
//   DC  = data/command select (low = command, high = data)
//   RST = RESX, active low
//   BL  = backlight enable, active high
//
// Protocol:
//   D/C low  + [CMD]       -> command opcode
//   D/C high + [DATA ...]  -> parameters or pixel data
//   Example: [0x3A] then [0x55] -> Pixel Format = 16bpp (RGB565)
//   Pixels follow RAMWR (0x2C) as big-endian RGB565 into the window
//   programmed by CASET (0x2A) / RASET (0x2B).
//
// Geometry: controller RAM is taller than the glass, so every row address
// goes out shifted by `panel_row_offset`.
//
// There is no read-back: the controller is never polled, every wait below is
// a blind datasheet delay.

use core::fmt;

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use embedded_graphics::prelude::IntoStorage;
use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};
use log::{debug, info, warn};

use crate::panel::{BufferDescriptor, Capabilities, DisplayDriver, Orientation, PixelFormat};

// Common 1.69" glass: 240x280 visible out of the controller's 240x320 RAM.
pub const NV3030B_WIDTH: u16 = 240;
pub const NV3030B_HEIGHT: u16 = 280;
pub const NV3030B_ROW_OFFSET: u16 = 20;

/// Pixels per bus transfer when the driver generates the pixel data itself.
pub const FILL_CHUNK_PIXELS: usize = 32;
const FILL_CHUNK_BYTES: usize = FILL_CHUNK_PIXELS * 2;

/// Controller opcodes.
pub mod cmd {
    pub const SWRESET: u8 = 0x01; // Soft Reset
    pub const SLPIN: u8 = 0x10; // Sleep In
    pub const SLPOUT: u8 = 0x11; // Sleep Out
    pub const INVOFF: u8 = 0x20; // Display Inversion OFF
    pub const INVON: u8 = 0x21; // Display Inversion ON
    pub const DISPOFF: u8 = 0x28; // Display OFF
    pub const DISPON: u8 = 0x29; // Display ON
    pub const CASET: u8 = 0x2A; // Column address set
    pub const RASET: u8 = 0x2B; // Row address set
    pub const RAMWR: u8 = 0x2C; // Memory write
    pub const MADCTL: u8 = 0x36; // Memory data access control
    pub const COLMOD: u8 = 0x3A; // Pixel format
}

const MADCTL_RGB: u8 = 0x00; // RGB order, normal scan direction
const COLMOD_RGB565: u8 = 0x55; // 16 bits/pixel

// Datasheet minimums. Waiting longer is fine, shorter is not.
const DC_SETTLE_US: u32 = 1;
const RESET_PULSE_MS: u32 = 20;
const RESET_RELEASE_MS: u32 = 120;
const RESET_SETTLE_MS: u32 = 50;
const SWRESET_MS: u32 = 150;
const SLEEP_MS: u32 = 120;
const DISPON_MS: u32 = 20;

const SUPPORTED_FORMATS: &[PixelFormat] = &[PixelFormat::Rgb565];

/// Error type that wraps SPI and GPIO errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nv3030bError<SpiE, GpioE> {
    Spi(SpiE),
    Gpio(GpioE),
    /// Buffer stride is narrower than the buffer width.
    InvalidStride,
    /// Buffer rows are padded; only packed buffers can be streamed.
    PaddedStride,
    BufferTooShort,
    OutOfBounds,
    /// Pixel format or orientation other than the one the panel runs in.
    Unsupported,
    /// Drawing before a successful `init`.
    NotInitialized,
}

impl<SpiE: fmt::Debug, GpioE: fmt::Debug> fmt::Display for Nv3030bError<SpiE, GpioE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "spi transfer failed: {:?}", e),
            Self::Gpio(e) => write!(f, "gpio line failed: {:?}", e),
            Self::InvalidStride => f.write_str("buffer stride narrower than width"),
            Self::PaddedStride => f.write_str("buffer stride wider than width"),
            Self::BufferTooShort => f.write_str("buffer shorter than the described rectangle"),
            Self::OutOfBounds => f.write_str("rectangle outside the panel"),
            Self::Unsupported => f.write_str("unsupported pixel format or orientation"),
            Self::NotInitialized => f.write_str("panel not initialized"),
        }
    }
}

/// Error of a driver built on bus `SPI` and control lines of type `DC`.
pub type PanelError<SPI, DC> = Nv3030bError<
    <SPI as embedded_hal::spi::ErrorType>::Error,
    <DC as embedded_hal::digital::ErrorType>::Error,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroSize,
    /// Last row plus the row offset does not fit in 16 bits.
    RowOffsetOverflow,
}

/// Panel geometry, fixed for the life of a driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelConfig {
    width: u16,
    height: u16,
    panel_row_offset: u16,
}

impl PanelConfig {
    pub fn new(width: u16, height: u16, panel_row_offset: u16) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if (height - 1).checked_add(panel_row_offset).is_none() {
            return Err(ConfigError::RowOffsetOverflow);
        }
        Ok(Self { width, height, panel_row_offset })
    }

    #[inline]
    pub fn width(&self) -> u16 { self.width }

    #[inline]
    pub fn height(&self) -> u16 { self.height }

    #[inline]
    pub fn panel_row_offset(&self) -> u16 { self.panel_row_offset }

    pub fn full_window(&self) -> Window {
        Window::new(0, 0, self.width - 1, self.height - 1)
    }

    /// True if `w` is ordered and lies entirely on the panel.
    pub fn contains(&self, w: &Window) -> bool {
        w.x0 <= w.x1 && w.y0 <= w.y1 && w.x1 < self.width && w.y1 < self.height
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: NV3030B_WIDTH,
            height: NV3030B_HEIGHT,
            panel_row_offset: NV3030B_ROW_OFFSET,
        }
    }
}

/// Inclusive pixel rectangle in panel coordinates (before the row offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
}

impl Window {
    pub const fn new(x0: u16, y0: u16, x1: u16, y1: u16) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// `None` for an empty rectangle or one whose far corner overflows `u16`.
    pub fn from_origin_size(x: u16, y: u16, width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let x1 = x.checked_add(width - 1)?;
        let y1 = y.checked_add(height - 1)?;
        Some(Self::new(x, y, x1, y1))
    }

    /// Pixel count of an ordered window.
    pub fn pixel_count(&self) -> u32 {
        let w = self.x1 as u32 - self.x0 as u32 + 1;
        let h = self.y1 as u32 - self.y0 as u32 + 1;
        w.saturating_mul(h)
    }
}

/// Where the power-on sequence got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    GpioConfigured,
    Reset,
    CommandsIssued,
    Ready,
}

#[inline]
fn address_pair(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

/// NV3030B panel on an SPI bus with D/C, reset and backlight lines.
///
/// The driver owns its bus, lines and delay source. Drawing is refused with
/// [`Nv3030bError::NotInitialized`] until [`init`](Self::init) succeeds.
pub struct Nv3030b<SPI, DC, RST, BL, D> {
    spi: SPI,
    dc: DC,
    rst: RST,
    bl: BL,
    delay: D,
    config: PanelConfig,
    state: InitState,
}

impl<SPI, DC, RST, BL, D> Nv3030b<SPI, DC, RST, BL, D> {
    /// Wrap the hardware. Nothing is sent until `init`.
    pub fn new(spi: SPI, dc: DC, rst: RST, bl: BL, delay: D, config: PanelConfig) -> Self {
        Self {
            spi,
            dc,
            rst,
            bl,
            delay,
            config,
            state: InitState::Uninitialized,
        }
    }

    #[inline]
    pub fn config(&self) -> &PanelConfig { &self.config }

    #[inline]
    pub fn state(&self) -> InitState { self.state }

    #[inline]
    pub fn is_initialized(&self) -> bool { self.state == InitState::Ready }

    /// Give back the bus, the D/C, reset and backlight lines, and the delay.
    pub fn release(self) -> (SPI, DC, RST, BL, D) {
        (self.spi, self.dc, self.rst, self.bl, self.delay)
    }
}

impl<SPI, DC, RST, BL, D> Nv3030b<SPI, DC, RST, BL, D>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
    BL: OutputPin<Error = DC::Error>,
    D: DelayNs,
{
    /// Reset the controller and run the power-on sequence.
    ///
    /// On success the panel is on, the backlight is lit and the screen is
    /// black. On failure the driver stays uninitialized; call `init` again to
    /// retry from scratch.
    pub fn init(&mut self) -> Result<(), PanelError<SPI, DC>> {
        self.state = InitState::Uninitialized;
        info!(
            "nv3030b: init {}x{}, row offset {}",
            self.config.width, self.config.height, self.config.panel_row_offset
        );

        if let Err(e) = self.bring_up() {
            warn!("nv3030b: init aborted in {:?}: {}", self.state, e);
            return Err(e);
        }

        info!("nv3030b: ready");
        Ok(())
    }

    fn bring_up(&mut self) -> Result<(), PanelError<SPI, DC>> {
        self.configure_lines()?;
        self.advance(InitState::GpioConfigured);

        self.hard_reset()?;
        self.advance(InitState::Reset);

        self.init_sequence()?;
        self.advance(InitState::CommandsIssued);

        self.backlight(true)?;
        self.stream_fill(self.config.full_window(), Rgb565::BLACK)?;
        self.advance(InitState::Ready);
        Ok(())
    }

    fn advance(&mut self, next: InitState) {
        debug!("nv3030b: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    // All three lines start inactive: command mode, out of reset, backlight off.
    fn configure_lines(&mut self) -> Result<(), PanelError<SPI, DC>> {
        self.dc.set_low().map_err(Nv3030bError::Gpio)?;
        self.rst.set_high().map_err(Nv3030bError::Gpio)?;
        self.bl.set_low().map_err(Nv3030bError::Gpio)
    }

    fn hard_reset(&mut self) -> Result<(), PanelError<SPI, DC>> {
        self.rst.set_low().map_err(Nv3030bError::Gpio)?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.rst.set_high().map_err(Nv3030bError::Gpio)?;
        self.delay.delay_ms(RESET_RELEASE_MS);
        self.delay.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    fn init_sequence(&mut self) -> Result<(), PanelError<SPI, DC>> {
        self.write_command(cmd::SWRESET)?;
        self.delay.delay_ms(SWRESET_MS);

        self.write_command(cmd::SLPOUT)?;
        self.delay.delay_ms(SLEEP_MS);

        self.write_command_with_payload(cmd::MADCTL, &[MADCTL_RGB])?;
        self.write_command_with_payload(cmd::COLMOD, &[COLMOD_RGB565])?;

        // This glass shows the complement of every color without inversion.
        self.write_command(cmd::INVON)?;

        self.program_window(self.config.full_window())?;

        self.write_command(cmd::DISPON)?;
        self.delay.delay_ms(DISPON_MS);
        Ok(())
    }

    // ---- Command framing ----

    fn select(&mut self, data: bool) -> Result<(), PanelError<SPI, DC>> {
        let level = if data { self.dc.set_high() } else { self.dc.set_low() };
        level.map_err(Nv3030bError::Gpio)?;
        // D/C must be stable before the first clock edge of the byte.
        self.delay.delay_us(DC_SETTLE_US);
        Ok(())
    }

    #[inline]
    fn transfer(&mut self, bytes: &[u8]) -> Result<(), PanelError<SPI, DC>> {
        self.spi.write(bytes).map_err(Nv3030bError::Spi)
    }

    pub(crate) fn write_command(&mut self, code: u8) -> Result<(), PanelError<SPI, DC>> {
        self.select(false)?;
        self.transfer(&[code])
    }

    pub(crate) fn write_payload(&mut self, bytes: &[u8]) -> Result<(), PanelError<SPI, DC>> {
        self.select(true)?;
        if bytes.is_empty() {
            return Ok(());
        }
        self.transfer(bytes)
    }

    pub(crate) fn write_command_with_payload(
        &mut self,
        code: u8,
        bytes: &[u8],
    ) -> Result<(), PanelError<SPI, DC>> {
        self.write_command(code)?;
        self.write_payload(bytes)
    }

    // ---- Addressing ----

    pub(crate) fn program_window(&mut self, w: Window) -> Result<(), PanelError<SPI, DC>> {
        let offset = self.config.panel_row_offset;
        let row0 = w.y0.wrapping_add(offset);
        let row1 = w.y1.wrapping_add(offset);

        self.write_command_with_payload(cmd::CASET, &address_pair(w.x0, w.x1))?;
        self.write_command_with_payload(cmd::RASET, &address_pair(row0, row1))
    }

    // Window, RAMWR, then D/C high once for the whole pixel stream.
    fn begin_memory_write(&mut self, w: Window) -> Result<(), PanelError<SPI, DC>> {
        self.program_window(w)?;
        self.write_command(cmd::RAMWR)?;
        self.select(true)
    }

    // ---- Pixel streaming ----

    fn stream_fill(&mut self, w: Window, color: Rgb565) -> Result<(), PanelError<SPI, DC>> {
        self.begin_memory_write(w)?;

        let [hi, lo] = color.into_storage().to_be_bytes();
        let mut chunk = [0u8; FILL_CHUNK_BYTES];
        for px in chunk.chunks_exact_mut(2) {
            px[0] = hi;
            px[1] = lo;
        }

        let mut remaining = w.pixel_count();
        while remaining > 0 {
            let pixels = remaining.min(FILL_CHUNK_PIXELS as u32);
            self.transfer(&chunk[..pixels as usize * 2])?;
            remaining -= pixels;
        }
        Ok(())
    }

    /// Stream up to `w`'s pixel count colors, packed into bounded chunks.
    pub(crate) fn stream_pixels<I>(&mut self, w: Window, colors: I) -> Result<(), PanelError<SPI, DC>>
    where
        I: IntoIterator<Item = Rgb565>,
    {
        self.begin_memory_write(w)?;

        let mut chunk = [0u8; FILL_CHUNK_BYTES];
        let mut filled = 0usize;
        for color in colors.into_iter().take(w.pixel_count() as usize) {
            let [hi, lo] = color.into_storage().to_be_bytes();
            chunk[filled] = hi;
            chunk[filled + 1] = lo;
            filled += 2;
            if filled == FILL_CHUNK_BYTES {
                self.transfer(&chunk)?;
                filled = 0;
            }
        }
        if filled > 0 {
            self.transfer(&chunk[..filled])?;
        }
        Ok(())
    }

    // ---- Guarded public operations ----

    pub(crate) fn ensure_ready(&self) -> Result<(), PanelError<SPI, DC>> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Nv3030bError::NotInitialized)
        }
    }

    fn check_window(&self, w: &Window) -> Result<(), PanelError<SPI, DC>> {
        if self.config.contains(w) {
            Ok(())
        } else {
            Err(Nv3030bError::OutOfBounds)
        }
    }

    /// Program the controller's address window (row offset applied).
    pub fn set_window(&mut self, w: Window) -> Result<(), PanelError<SPI, DC>> {
        self.ensure_ready()?;
        self.check_window(&w)?;
        self.program_window(w)
    }

    /// Fill `w` with one color, streamed in `FILL_CHUNK_PIXELS` chunks.
    pub fn fill_rect(&mut self, w: Window, color: Rgb565) -> Result<(), PanelError<SPI, DC>> {
        self.ensure_ready()?;
        self.check_window(&w)?;
        self.stream_fill(w, color)
    }

    pub fn clear_screen(&mut self, color: Rgb565) -> Result<(), PanelError<SPI, DC>> {
        self.fill_rect(self.config.full_window(), color)
    }

    /// Send big-endian RGB565 bytes for `w` in a single transfer.
    ///
    /// Exactly `w`'s pixel count times two bytes go out; trailing bytes are
    /// ignored. The buffer is not re-chunked.
    pub fn blit(&mut self, w: Window, data: &[u8]) -> Result<(), PanelError<SPI, DC>> {
        self.ensure_ready()?;
        self.check_window(&w)?;

        let needed = w.pixel_count() as usize * 2;
        if data.len() < needed {
            return Err(Nv3030bError::BufferTooShort);
        }

        self.begin_memory_write(w)?;
        self.transfer(&data[..needed])
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), PanelError<SPI, DC>> {
        self.ensure_ready()?;
        self.backlight(on)
    }

    fn backlight(&mut self, on: bool) -> Result<(), PanelError<SPI, DC>> {
        let level = if on { self.bl.set_high() } else { self.bl.set_low() };
        level.map_err(Nv3030bError::Gpio)
    }

    /// Enter sleep. Frame memory is kept; the panel stops scanning.
    pub fn sleep_in(&mut self) -> Result<(), PanelError<SPI, DC>> {
        self.ensure_ready()?;
        self.write_command(cmd::SLPIN)?;
        self.delay.delay_ms(SLEEP_MS);
        Ok(())
    }

    pub fn sleep_out(&mut self) -> Result<(), PanelError<SPI, DC>> {
        self.ensure_ready()?;
        self.write_command(cmd::SLPOUT)?;
        self.delay.delay_ms(SLEEP_MS);
        Ok(())
    }
}

impl<SPI, DC, RST, BL, D> DisplayDriver for Nv3030b<SPI, DC, RST, BL, D>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
    BL: OutputPin<Error = DC::Error>,
    D: DelayNs,
{
    type Error = PanelError<SPI, DC>;

    // Panel off before the backlight goes, so stale RAM never flashes.
    fn blanking_on(&mut self) -> Result<(), Self::Error> {
        self.ensure_ready()?;
        self.write_command(cmd::DISPOFF)?;
        self.backlight(false)
    }

    fn blanking_off(&mut self) -> Result<(), Self::Error> {
        self.ensure_ready()?;
        self.write_command(cmd::DISPON)?;
        self.backlight(true)
    }

    // COLMOD is fixed by the power-on sequence.
    fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), Self::Error> {
        match format {
            PixelFormat::Rgb565 => Ok(()),
            _ => Err(Nv3030bError::Unsupported),
        }
    }

    // TODO: rotation through the MADCTL MV/MX/MY bits, with the row offset
    // moving to the column axis for 90/270.
    fn set_orientation(&mut self, orientation: Orientation) -> Result<(), Self::Error> {
        match orientation {
            Orientation::Normal => Ok(()),
            _ => Err(Nv3030bError::Unsupported),
        }
    }

    fn write(
        &mut self,
        x: u16,
        y: u16,
        desc: &BufferDescriptor,
        buf: &[u8],
    ) -> Result<(), Self::Error> {
        if desc.stride < desc.width {
            return Err(Nv3030bError::InvalidStride);
        }
        if desc.stride > desc.width {
            return Err(Nv3030bError::PaddedStride);
        }
        self.ensure_ready()?;
        if desc.width == 0 || desc.height == 0 {
            return Ok(());
        }

        let window = Window::from_origin_size(x, y, desc.width, desc.height)
            .ok_or(Nv3030bError::OutOfBounds)?;
        self.blit(window, buf)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            x_resolution: self.config.width,
            y_resolution: self.config.height,
            supported_pixel_formats: SUPPORTED_FORMATS,
            current_pixel_format: PixelFormat::Rgb565,
            current_orientation: Orientation::Normal,
        }
    }
}

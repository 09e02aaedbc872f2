//! Display setup and initialization module.
//
// - `setup_display` builds the SPI device around the board pins and runs
//   the NV3030B power-on sequence.

use core::convert::Infallible;
use core::fmt;

use esp_backtrace as _;
use esp_hal::{
    delay::Delay,
    gpio::Output,
    spi::master::{Config, ConfigError, Spi},
    spi::Mode,
    time::Rate,
    Blocking,
};
use embedded_hal_bus::spi::{DeviceError, ExclusiveDevice, NoDelay};

use crate::nv3030b::{Nv3030b, Nv3030bError, PanelConfig};
use crate::wiring::DisplayPins;

// 40 MHz is the fastest clock the panel's SPI interface is rated for.
const SPI_FREQUENCY_HZ: u32 = 40_000_000;

pub type SpiDev<'a> = ExclusiveDevice<Spi<'a, Blocking>, Output<'a>, NoDelay>;

pub type DisplayType<'a> = Nv3030b<SpiDev<'a>, Output<'a>, Output<'a>, Output<'a>, Delay>;

pub type PanelInitError = Nv3030bError<DeviceError<esp_hal::spi::Error, Infallible>, Infallible>;

#[derive(Debug)]
pub enum SetupError {
    /// esp-hal rejected the SPI clock/mode.
    SpiConfig(ConfigError),
    Panel(PanelInitError),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::SpiConfig(e) => write!(f, "spi config rejected: {:?}", e),
            SetupError::Panel(e) => write!(f, "panel init failed: {}", e),
        }
    }
}

pub fn setup_display<'a>(
    display_pins: DisplayPins<'a>,
    config: PanelConfig,
) -> Result<DisplayType<'a>, SetupError> {
    let DisplayPins {
        spi2,
        spi_sck,
        spi_mosi,
        lcd_cs,
        lcd_dc,
        lcd_rst,
        lcd_bl,
    } = display_pins;

    // SPI @ 40 MHz, Mode 3 (clock idles high, sample on rising edge)
    let spi = Spi::new(
        spi2,
        Config::default()
            .with_frequency(Rate::from_hz(SPI_FREQUENCY_HZ))
            .with_mode(Mode::_3),
    )
    .map_err(SetupError::SpiConfig)?
    .with_sck(spi_sck)
    .with_mosi(spi_mosi);

    // CS on a GPIO can't fail.
    let spi_dev = match ExclusiveDevice::new(spi, lcd_cs, NoDelay) {
        Ok(dev) => dev,
        Err(e) => match e {},
    };

    let mut display = Nv3030b::new(spi_dev, lcd_dc, lcd_rst, lcd_bl, Delay::new(), config);
    display.init().map_err(SetupError::Panel)?;
    Ok(display)
}

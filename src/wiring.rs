// Board pin mapping for the ESP32-S3 devkit carrying the 1.69" NV3030B panel.
//! The following wiring is assumed:
//! - LCD SCK  => GPIO10
//! - LCD MOSI => GPIO11
//! - LCD CS   => GPIO9
//! - LCD DC   => GPIO8
//! - LCD RST  => GPIO14
//! - LCD BL   => GPIO2
//! - GND => GND
//! - 3.3V => 3.3V

use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::peripherals::{Peripherals, GPIO10, GPIO11, SPI2};

/// Everything `setup_display` needs. The D/C, RST and BL lines start in the
/// levels the driver expects before `init` (command, released, dark).
pub struct DisplayPins<'a> {
    pub spi2: SPI2<'a>,
    pub spi_sck: GPIO10<'a>,
    pub spi_mosi: GPIO11<'a>,
    pub lcd_cs: Output<'a>,  // GPIO9
    pub lcd_dc: Output<'a>,  // GPIO8
    pub lcd_rst: Output<'a>, // GPIO14
    pub lcd_bl: Output<'a>,  // GPIO2
}

pub fn init_display_pins<'a>(p: Peripherals) -> DisplayPins<'a> {
    // Do NOT touch GPIO10/11 here, the SPI driver takes them as SCK/MOSI.
    let lcd_cs  = Output::new(p.GPIO9,  Level::High, OutputConfig::default());
    let lcd_dc  = Output::new(p.GPIO8,  Level::Low,  OutputConfig::default());
    let lcd_rst = Output::new(p.GPIO14, Level::High, OutputConfig::default());
    let lcd_bl  = Output::new(p.GPIO2,  Level::Low,  OutputConfig::default());

    DisplayPins {
        spi2: p.SPI2,
        spi_sck: p.GPIO10,
        spi_mosi: p.GPIO11,
        lcd_cs,
        lcd_dc,
        lcd_rst,
        lcd_bl,
    }
}

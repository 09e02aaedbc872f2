//! NV3030B panel demo
//! ========================================
//! needs to be run in WSL2 terminal
//! source ~/export-esp.sh
//! cargo run --release --features esp32s3-board
//! ========================================
//!
//! Brings the panel up, draws a test card and then blanks/unblanks the
//! display every two seconds.

//% CHIPS: esp32s3
//% FEATURES: esp-hal/unstable

#![no_std]
#![no_main]

// Define the application description, which is placed in a special section of the binary.
// This is used by the bootloader to verify the application.
esp_bootloader_esp_idf::esp_app_desc!();

use esp_backtrace as _;
use esp_hal::{delay::Delay, main, Config};

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Circle, PrimitiveStyle, Rectangle, Triangle},
    text::{Alignment, Text},
};
use log::{error, info};

use nv3030b_display::{
    display::{setup_display, DisplayType},
    wiring::init_display_pins,
    DisplayDriver, PanelConfig,
};

const BLANK_PERIOD_MS: u32 = 2_000;

fn draw_test_card(display: &mut DisplayType<'_>) -> Result<(), nv3030b_display::display::PanelInitError> {
    let size = display.size();
    let w = size.width as i32;
    let h = size.height as i32;

    display.clear(Rgb565::BLACK)?;

    // Color bars across the top
    let bars = [Rgb565::RED, Rgb565::GREEN, Rgb565::BLUE, Rgb565::WHITE];
    let bar_w = size.width / bars.len() as u32;
    for (i, color) in bars.iter().enumerate() {
        Rectangle::new(Point::new(i as i32 * bar_w as i32, 0), Size::new(bar_w, 40))
            .into_styled(PrimitiveStyle::with_fill(*color))
            .draw(display)?;
    }

    Circle::with_center(Point::new(w / 2, h / 2), 120)
        .into_styled(PrimitiveStyle::with_stroke(Rgb565::YELLOW, 4))
        .draw(display)?;

    Triangle::new(
        Point::new(w / 2, h / 2 - 40),
        Point::new(w / 2 - 35, h / 2 + 25),
        Point::new(w / 2 + 35, h / 2 + 25),
    )
    .into_styled(PrimitiveStyle::with_fill(Rgb565::CYAN))
    .draw(display)?;

    Text::with_alignment(
        "NV3030B",
        Point::new(w / 2, h - 30),
        MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE),
        Alignment::Center,
    )
    .draw(display)?;

    Ok(())
}

#[main]
fn main() -> ! {
    let peripherals = esp_hal::init(Config::default());
    esp_println::logger::init_logger(log::LevelFilter::Info);

    let pins = init_display_pins(peripherals);
    let delay = Delay::new();

    let mut display = match setup_display(pins, PanelConfig::default()) {
        Ok(display) => display,
        Err(e) => {
            error!("display setup failed: {}", e);
            loop {
                delay.delay_millis(1_000);
            }
        }
    };

    if let Err(e) = draw_test_card(&mut display) {
        error!("test card failed: {}", e);
    }
    info!("test card drawn, caps: {:?}", display.capabilities());

    let mut blanked = false;
    loop {
        delay.delay_millis(BLANK_PERIOD_MS);
        blanked = !blanked;
        let res = if blanked { display.blanking_on() } else { display.blanking_off() };
        if let Err(e) = res {
            error!("blanking toggle failed: {}", e);
        }
    }
}

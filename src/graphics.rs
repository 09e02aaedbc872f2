//! embedded-graphics `DrawTarget` for the NV3030B driver.
//
// Everything is clipped to the panel first. Whole-rectangle fills go out as
// one window + RAMWR; scattered pixels cost a 1x1 window each.

use embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle};
use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};

use crate::nv3030b::{Nv3030b, PanelError, Window};

// Only for rectangles already clipped to the panel.
fn to_window(area: &Rectangle) -> Option<Window> {
    let br = area.bottom_right()?;
    let tl = area.top_left;
    Some(Window::new(tl.x as u16, tl.y as u16, br.x as u16, br.y as u16))
}

impl<SPI, DC, RST, BL, D> OriginDimensions for Nv3030b<SPI, DC, RST, BL, D> {
    fn size(&self) -> Size {
        Size::new(self.config().width() as u32, self.config().height() as u32)
    }
}

impl<SPI, DC, RST, BL, D> DrawTarget for Nv3030b<SPI, DC, RST, BL, D>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
    BL: OutputPin<Error = DC::Error>,
    D: DelayNs,
{
    type Color = Rgb565;
    type Error = PanelError<SPI, DC>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.ensure_ready()?;
        let bounds = self.bounding_box();
        for Pixel(p, color) in pixels {
            if !bounds.contains(p) {
                continue;
            }
            let (x, y) = (p.x as u16, p.y as u16);
            self.fill_rect(Window::new(x, y, x, y), color)?;
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.ensure_ready()?;
        let visible = area.intersection(&self.bounding_box());

        if visible == *area {
            return match to_window(area) {
                Some(window) => self.stream_pixels(window, colors),
                None => Ok(()),
            };
        }

        // Partly off-screen: walk the full area so colors stay aligned.
        self.draw_iter(
            area.points()
                .zip(colors)
                .filter(|(p, _)| visible.contains(*p))
                .map(|(p, c)| Pixel(p, c)),
        )
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.ensure_ready()?;
        match to_window(&area.intersection(&self.bounding_box())) {
            Some(window) => self.fill_rect(window, color),
            None => Ok(()),
        }
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_screen(color)
    }
}

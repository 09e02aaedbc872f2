//! Display capability interface.
//
// The graphics side talks to any panel through `DisplayDriver`: blanking,
// format/orientation negotiation, a capability snapshot and a raw rectangle
// write. Panels that are hard-wired to one format say so through
// `Capabilities` and reject everything else with their own error.

/// Pixel layouts a display consumer may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb888,
    Mono01,
    Mono10,
    Argb8888,
    Rgb565,
    Bgr565,
    L8,
    Al88,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 8] = [
        PixelFormat::Rgb888,
        PixelFormat::Mono01,
        PixelFormat::Mono10,
        PixelFormat::Argb8888,
        PixelFormat::Rgb565,
        PixelFormat::Bgr565,
        PixelFormat::L8,
        PixelFormat::Al88,
    ];

    /// Bits per pixel on the wire.
    pub const fn bits_per_pixel(self) -> u8 {
        match self {
            PixelFormat::Mono01 | PixelFormat::Mono10 => 1,
            PixelFormat::L8 => 8,
            PixelFormat::Rgb565 | PixelFormat::Bgr565 | PixelFormat::Al88 => 16,
            PixelFormat::Rgb888 => 24,
            PixelFormat::Argb8888 => 32,
        }
    }
}

/// Panel scan orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Normal,
    Rotated90,
    Rotated180,
    Rotated270,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Normal,
        Orientation::Rotated90,
        Orientation::Rotated180,
        Orientation::Rotated270,
    ];
}

/// Shape of a caller-supplied pixel buffer.
///
/// `stride` is the number of pixels between the starts of two consecutive
/// rows in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub width: u16,
    pub height: u16,
    pub stride: u16,
}

impl BufferDescriptor {
    /// Tightly packed buffer (`stride == width`).
    pub const fn packed(width: u16, height: u16) -> Self {
        Self { width, height, stride: width }
    }
}

/// Read-only snapshot of what a panel can do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub x_resolution: u16,
    pub y_resolution: u16,
    pub supported_pixel_formats: &'static [PixelFormat],
    pub current_pixel_format: PixelFormat,
    pub current_orientation: Orientation,
}

impl Capabilities {
    pub fn supports(&self, format: PixelFormat) -> bool {
        self.supported_pixel_formats.contains(&format)
    }
}

/// Fixed capability table every panel driver exposes to the graphics stack.
pub trait DisplayDriver {
    type Error;

    /// Stop showing frame memory (panel off, then backlight off).
    fn blanking_on(&mut self) -> Result<(), Self::Error>;

    /// Resume showing frame memory (panel on, then backlight on).
    fn blanking_off(&mut self) -> Result<(), Self::Error>;

    fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), Self::Error>;

    fn set_orientation(&mut self, orientation: Orientation) -> Result<(), Self::Error>;

    /// Write `buf`, laid out as `desc`, with its top-left pixel at `(x, y)`.
    fn write(
        &mut self,
        x: u16,
        y: u16,
        desc: &BufferDescriptor,
        buf: &[u8],
    ) -> Result<(), Self::Error>;

    fn capabilities(&self) -> Capabilities;
}

#![cfg_attr(not(test), no_std)]

pub mod graphics;
pub mod nv3030b;
pub mod panel;

#[cfg(feature = "esp32s3-board")]
pub mod display;
#[cfg(feature = "esp32s3-board")]
pub mod wiring;

#[cfg(test)]
mod mock;

pub use nv3030b::{
    InitState, Nv3030b, Nv3030bError, PanelConfig, PanelError, Window, NV3030B_HEIGHT,
    NV3030B_ROW_OFFSET, NV3030B_WIDTH,
};
pub use panel::{BufferDescriptor, Capabilities, DisplayDriver, Orientation, PixelFormat};

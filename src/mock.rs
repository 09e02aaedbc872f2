//! Recording embedded-hal doubles shared by the driver tests.
//!
//! Every handle logs into one shared [`Bus`], so a test sees pin edges,
//! transfers and delays in the exact order the driver produced them.

use core::cell::RefCell;
use std::rc::Rc;

use embedded_hal::{delay::DelayNs, digital, spi};

use crate::nv3030b::{Nv3030b, PanelConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Dc,
    Reset,
    Backlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Pin(Line, bool),
    Write(Vec<u8>),
    DelayNs(u32),
    DelayUs(u32),
    DelayMs(u32),
}

/// A transfer as the controller sees it, with D/C resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Command(u8),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl spi::Error for MockError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl digital::Error for MockError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

#[derive(Default)]
struct BusState {
    events: Vec<Event>,
    write_attempts: usize,
    fail_write: Option<usize>,
    fail_line: Option<Line>,
    fail_drive: Option<(Line, bool)>,
}

#[derive(Clone, Default)]
pub struct Bus(Rc<RefCell<BusState>>);

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the write with this zero-based index (counted since the last
    /// `clear`). Only that one attempt fails.
    pub fn fail_write_at(&self, index: usize) {
        self.0.borrow_mut().fail_write = Some(index);
    }

    /// Fail every level change on `line`.
    pub fn fail_line(&self, line: Line) {
        self.0.borrow_mut().fail_line = Some(line);
    }

    /// Fail only the changes that drive `line` to `level`.
    pub fn fail_drive(&self, line: Line, level: bool) {
        self.0.borrow_mut().fail_drive = Some((line, level));
    }

    pub fn clear(&self) {
        let mut state = self.0.borrow_mut();
        state.events.clear();
        state.write_attempts = 0;
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn write_attempts(&self) -> usize {
        self.0.borrow().write_attempts
    }

    pub fn frames(&self) -> Vec<Frame> {
        let mut data = false;
        let mut frames = Vec::new();
        for event in self.0.borrow().events.iter() {
            match event {
                Event::Pin(Line::Dc, level) => data = *level,
                Event::Write(bytes) if data => frames.push(Frame::Data(bytes.clone())),
                Event::Write(bytes) => frames.extend(bytes.iter().map(|b| Frame::Command(*b))),
                _ => {}
            }
        }
        frames
    }

    pub fn commands(&self) -> Vec<u8> {
        self.frames()
            .into_iter()
            .filter_map(|f| match f {
                Frame::Command(c) => Some(c),
                Frame::Data(_) => None,
            })
            .collect()
    }

    /// Data transfers after the last memory-write command.
    pub fn pixel_transfers(&self) -> Vec<Vec<u8>> {
        let frames = self.frames();
        let start = frames
            .iter()
            .rposition(|f| *f == Frame::Command(crate::nv3030b::cmd::RAMWR))
            .map_or(frames.len(), |i| i + 1);
        frames[start..]
            .iter()
            .filter_map(|f| match f {
                Frame::Data(d) => Some(d.clone()),
                Frame::Command(_) => None,
            })
            .collect()
    }

    pub fn delays_ms(&self) -> Vec<u32> {
        self.0
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::DelayMs(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub fn spi(&self) -> MockSpi {
        MockSpi(self.clone())
    }

    pub fn pin(&self, line: Line) -> MockPin {
        MockPin { line, bus: self.clone() }
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay(self.clone())
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }
}

pub struct MockSpi(Bus);

impl spi::ErrorType for MockSpi {
    type Error = MockError;
}

impl spi::SpiDevice<u8> for MockSpi {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), MockError> {
        let mut state = self.0 .0.borrow_mut();
        for op in operations.iter() {
            if let spi::Operation::Write(bytes) = op {
                let index = state.write_attempts;
                state.write_attempts += 1;
                if state.fail_write == Some(index) {
                    state.fail_write = None;
                    return Err(MockError);
                }
                state.events.push(Event::Write(bytes.to_vec()));
            }
        }
        Ok(())
    }
}

pub struct MockPin {
    line: Line,
    bus: Bus,
}

impl MockPin {
    fn drive(&mut self, level: bool) -> Result<(), MockError> {
        {
            let state = self.bus.0.borrow();
            if state.fail_line == Some(self.line) || state.fail_drive == Some((self.line, level)) {
                return Err(MockError);
            }
        }
        self.bus.push(Event::Pin(self.line, level));
        Ok(())
    }
}

impl digital::ErrorType for MockPin {
    type Error = MockError;
}

impl digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), MockError> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), MockError> {
        self.drive(true)
    }
}

pub struct MockDelay(Bus);

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.push(Event::DelayNs(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.0.push(Event::DelayUs(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.push(Event::DelayMs(ms));
    }
}

pub type MockPanel = Nv3030b<MockSpi, MockPin, MockPin, MockPin, MockDelay>;

pub fn panel(bus: &Bus, config: PanelConfig) -> MockPanel {
    Nv3030b::new(
        bus.spi(),
        bus.pin(Line::Dc),
        bus.pin(Line::Reset),
        bus.pin(Line::Backlight),
        bus.delay(),
        config,
    )
}

/// Initialized panel with an empty log.
pub fn ready_panel(bus: &Bus, config: PanelConfig) -> MockPanel {
    let mut p = panel(bus, config);
    p.init().unwrap();
    bus.clear();
    p
}

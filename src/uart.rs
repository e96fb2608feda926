use std::{cell::RefCell, collections::BTreeMap, convert::Infallible, io, rc::Rc};

use bytes::{BufMut, BytesMut};

use crate::config::ConfigError;

/// Outbound byte channel to the unit.
///
/// The transport owns its own failure semantics, callers get its error type back untouched.
pub trait Uart {
    type Error;

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;
}

/// Shared handle to a channel owned by the host. The component never closes or replaces it.
pub type UartHandle<U> = Rc<RefCell<U>>;

/// Any `io::Write` (a serial port, stdout, a file) used as a channel
pub struct IoUart<W> {
    writer: W,
}

impl<W: io::Write> IoUart<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Uart for IoUart<W> {
    type Error = io::Error;

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.writer.write_all(&[byte])?;
        self.writer.flush()
    }
}

// In-memory channel, used for dry runs and tests
impl Uart for BytesMut {
    type Error = Infallible;

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.put_u8(byte);
        Ok(())
    }
}

/// UARTs declared by the host, addressed by id and iterated in id order
pub struct UartRegistry<U> {
    uarts: BTreeMap<String, UartHandle<U>>,
}

impl<U> UartRegistry<U> {
    pub fn new() -> Self {
        Self {
            uarts: BTreeMap::new(),
        }
    }

    /// Declares a UART under `id` and returns the shared handle. Redeclaring an id replaces it.
    pub fn declare(&mut self, id: impl Into<String>, uart: U) -> UartHandle<U> {
        let handle = Rc::new(RefCell::new(uart));
        self.uarts.insert(id.into(), handle.clone());
        handle
    }

    pub fn resolve(&self, id: &str) -> Result<UartHandle<U>, ConfigError> {
        self.uarts
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownUart(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UartHandle<U>)> {
        self.uarts.iter().map(|(id, h)| (id.as_str(), h))
    }
}

impl<U> Default for UartRegistry<U> {
    fn default() -> Self {
        Self::new()
    }
}

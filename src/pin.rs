//! Pin driver capabilities needed by the bus engine.
//!
//! Levels are set and read through the `embedded-hal` digital traits. The
//! data line additionally has to switch between driving the bus and
//! listening to it, which is what [`ModeSwitch`] adds.

use embedded_hal::digital::v2::{InputPin, OutputPin};

/// Direction control for a bidirectional pin
pub trait ModeSwitch {
    /// Pin error
    type Error;

    /// Stop driving the line and listen, with the pull-up enabled
    fn set_input_pull_up(&mut self) -> Result<(), Self::Error>;

    /// Drive the line with the last level written
    fn set_output(&mut self) -> Result<(), Self::Error>;
}

/// Adapter for a GPIO already configured as open-drain output.
///
/// Driving high releases an open-drain line, so "input with pull-up" is a
/// release and "output" needs no change. Reads go straight to the pin.
pub struct OpenDrain<P> {
    pin: P,
}

impl<P> OpenDrain<P> {
    /// Wrap an open-drain pin
    pub fn new(pin: P) -> Self {
        OpenDrain { pin }
    }

    /// Give the wrapped pin back
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P, E> ModeSwitch for OpenDrain<P>
where
    P: OutputPin<Error = E> + InputPin<Error = E>,
{
    type Error = E;

    fn set_input_pull_up(&mut self) -> Result<(), E> {
        self.pin.set_high()
    }

    fn set_output(&mut self) -> Result<(), E> {
        Ok(())
    }
}

impl<P, E> OutputPin for OpenDrain<P>
where
    P: OutputPin<Error = E>,
{
    type Error = E;

    #[inline]
    fn set_low(&mut self) -> Result<(), E> {
        self.pin.set_low()
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), E> {
        self.pin.set_high()
    }
}

impl<P, E> InputPin for OpenDrain<P>
where
    P: InputPin<Error = E>,
{
    type Error = E;

    #[inline]
    fn is_high(&self) -> Result<bool, E> {
        self.pin.is_high()
    }

    #[inline]
    fn is_low(&self) -> Result<bool, E> {
        self.pin.is_low()
    }
}

/*!
  # Bit-banged two-wire bus master

  This implementation consumes the following hardware resources:
  - Two GPIO pins for SDA and SCL lines, both pulled up.
  - A [`Timing`] source for the minimum hold times between transitions.

  The master drives SCL on its own: there is no clock stretching support,
  no multi-master arbitration and no 10-bit addressing. Every operation
  blocks until the bus is back to idle. A peripheral that holds SDA low
  forever hangs the transaction; interrupts that touch the same pins must
  be masked by the caller for the duration of a transaction.

  ## Bus rules

  - SDA must be steady while SCL is high, except for START and STOP.
  - SDA is sampled just before the SCL falling edge.
  - SDA is written just after the SCL falling edge.

  Between START and STOP both lines rest low (bus busy); outside of a
  transaction both are high (bus idle).

  ## Example

  Reading a 16-bit register from a sensor at address 0x48 with an
  open-drain SDA pin and a timer ticking at twice the bus frequency:

  ```ignore
    use bitbang_i2c::i2c::I2cBB;
    use bitbang_i2c::pin::OpenDrain;
    use bitbang_i2c::timing::Ticks;

    let tmr = Timer::tim3(pdev.TIM3, &clocks, &mut rcc.apb1).start_count_down(200.khz());
    let scl = gpioa.pa1.into_open_drain_output(&mut gpioa.crl);
    let sda = gpioa.pa2.into_open_drain_output(&mut gpioa.crl);

    let mut i2c = I2cBB::new(scl, OpenDrain::new(sda), Ticks::new(tmr)).unwrap();
    i2c.write_buffer(0x48, &[0x00]).unwrap();
    let raw = i2c.read_u16(0x48).unwrap();
  ```
*/

use crate::pin::ModeSwitch;
use crate::timing::Timing;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use log::{debug, trace};

/// I2C error
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<E> {
    /// GPIO error
    Bus(E),
    /// No ack received
    NoAck,
}

/// Acknowledge sent by the master after each byte of a read
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReadAck {
    /// Acknowledge every byte, the last one included
    AckAll,
    /// Not-acknowledge the last byte so the peripheral stops sending
    NackLast,
}

impl Default for ReadAck {
    fn default() -> Self {
        ReadAck::AckAll
    }
}

/// Bit banging I2C master.
///
/// Owns both bus pins, so only one master can drive a given pair.
pub struct I2cBB<SCL, SDA, T> {
    scl: SCL,
    sda: SDA,
    timing: T,
    read_ack: ReadAck,
}

impl<SCL, SDA, T, E> I2cBB<SCL, SDA, T>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E> + ModeSwitch<Error = E>,
    T: Timing,
{
    /// Create instance and release both lines
    pub fn new(scl: SCL, sda: SDA, timing: T) -> Result<Self, Error<E>> {
        let mut i2c = I2cBB {
            scl,
            sda,
            timing,
            read_ack: ReadAck::default(),
        };

        i2c.set_scl_high()?;
        i2c.set_sda_high()?;
        i2c.sda.set_output().map_err(Error::Bus)?;

        Ok(i2c)
    }

    /// Give the pins and the timing source back
    pub fn destroy(self) -> (SCL, SDA, T) {
        (self.scl, self.sda, self.timing)
    }

    /// Acknowledge policy for reads
    pub fn read_ack(&self) -> ReadAck {
        self.read_ack
    }

    /// Change the acknowledge policy for reads
    pub fn set_read_ack(&mut self, read_ack: ReadAck) {
        self.read_ack = read_ack;
    }

    /// Address the peripheral without data.
    ///
    /// Succeeds when the address byte is acknowledged.
    pub fn probe(&mut self, addr: u8) -> Result<(), Error<E>> {
        self.write_buffer(addr, &[])
    }

    /// Write transaction.
    ///
    /// Stops at the first byte that is not acknowledged; the bus is idle
    /// again when this returns, whatever the outcome.
    pub fn write_buffer(&mut self, addr: u8, output: &[u8]) -> Result<(), Error<E>> {
        // ST + SAD + W
        self.address(addr, false)?;

        for (index, byte) in output.iter().enumerate() {
            if !self.i2c_write_byte(*byte)? {
                debug!("i2c {:#04x}: data byte {} not acknowledged", addr, index);
                return Err(Error::NoAck);
            }
        }

        // SP
        self.i2c_stop()?;

        trace!("i2c {:#04x}: wrote {} bytes", addr, output.len());
        Ok(())
    }

    /// Read transaction filling `input`.
    ///
    /// An empty buffer still runs the address phase.
    pub fn read_buffer(&mut self, addr: u8, input: &mut [u8]) -> Result<(), Error<E>> {
        // ST + SAD + R
        self.address(addr, true)?;

        let last = input.len().wrapping_sub(1);
        for (index, byte) in input.iter_mut().enumerate() {
            let send_ack = self.read_ack == ReadAck::AckAll || index != last;
            *byte = self.i2c_read_byte(send_ack)?;
        }

        // SP
        self.i2c_stop()?;

        trace!("i2c {:#04x}: read {} bytes", addr, input.len());
        Ok(())
    }

    /// Read a single byte
    pub fn read_u8(&mut self, addr: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.read_buffer(addr, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Read two bytes, most significant first
    pub fn read_u16(&mut self, addr: u8) -> Result<u16, Error<E>> {
        let mut buffer = [0u8; 2];
        self.read_buffer(addr, &mut buffer)?;
        Ok(u16::from_be_bytes(buffer))
    }

    fn address(&mut self, addr: u8, read: bool) -> Result<(), Error<E>> {
        self.i2c_start()?;

        if !self.i2c_write_byte((addr << 1) | read as u8)? {
            debug!("i2c {:#04x}: address not acknowledged", addr);
            return Err(Error::NoAck);
        }

        Ok(())
    }

    /// Bus must be idle before, is busy after.
    #[inline]
    fn i2c_start(&mut self) -> Result<(), Error<E>> {
        self.set_sda_low()?;
        self.timing.start_hold();
        self.scl_fall()
    }

    /// Bus must be busy before, is idle after.
    #[inline]
    fn i2c_stop(&mut self) -> Result<(), Error<E>> {
        self.set_scl_high()?;
        self.timing.stop_hold();
        self.set_sda_high()
    }

    /// Returns whether the byte was acknowledged.
    ///
    /// Bus must be busy before. It stays busy on ACK and is released with a
    /// STOP on NACK, since nothing may follow a refused byte.
    #[inline(never)]
    fn i2c_write_byte(&mut self, byte: u8) -> Result<bool, Error<E>> {
        for bit_offset in 0..8 {
            let out_bit = (byte >> (7 - bit_offset)) & 0b1;

            if out_bit == 1 {
                self.set_sda_high()?;
            } else {
                self.set_sda_low()?;
            }

            self.scl_pulse()?;
        }

        self.sda.set_input_pull_up().map_err(Error::Bus)?;
        self.timing.input_settle();

        self.scl_raise()?;
        let nack = self.sda.is_high().map_err(Error::Bus)?;
        self.scl_fall()?;

        self.drive_sda_low()?;

        if nack {
            self.i2c_stop()?;
        }

        Ok(!nack)
    }

    /// Bus must be busy before, is busy after.
    #[inline(never)]
    fn i2c_read_byte(&mut self, send_ack: bool) -> Result<u8, Error<E>> {
        let mut byte: u8 = 0;

        self.sda.set_input_pull_up().map_err(Error::Bus)?;

        for _ in 0..8 {
            self.scl_raise()?;
            let bit = self.sda.is_high().map_err(Error::Bus)?;
            self.scl_fall()?;

            byte = (byte << 1) | bit as u8;
            self.timing.input_settle();
        }

        if send_ack {
            self.drive_sda_low()?;
            self.scl_pulse()?;
        } else {
            // released SDA during the ninth pulse is the NACK
            self.scl_pulse()?;
            self.drive_sda_low()?;
        }

        Ok(byte)
    }

    #[inline(always)]
    fn scl_raise(&mut self) -> Result<(), Error<E>> {
        self.timing.scl_low_hold();
        self.set_scl_high()?;
        self.timing.scl_high_hold();
        Ok(())
    }

    #[inline(always)]
    fn scl_fall(&mut self) -> Result<(), Error<E>> {
        self.set_scl_low()
    }

    #[inline(always)]
    fn scl_pulse(&mut self) -> Result<(), Error<E>> {
        self.scl_raise()?;
        self.scl_fall()
    }

    /// Latch the low level before enabling the driver so SDA never
    /// glitches high.
    #[inline(always)]
    fn drive_sda_low(&mut self) -> Result<(), Error<E>> {
        self.set_sda_low()?;
        self.sda.set_output().map_err(Error::Bus)
    }

    #[inline(always)]
    fn set_scl_high(&mut self) -> Result<(), Error<E>> {
        self.scl.set_high().map_err(Error::Bus)
    }

    #[inline(always)]
    fn set_scl_low(&mut self) -> Result<(), Error<E>> {
        self.scl.set_low().map_err(Error::Bus)
    }

    #[inline(always)]
    fn set_sda_high(&mut self) -> Result<(), Error<E>> {
        self.sda.set_high().map_err(Error::Bus)
    }

    #[inline(always)]
    fn set_sda_low(&mut self) -> Result<(), Error<E>> {
        self.sda.set_low().map_err(Error::Bus)
    }
}

impl<SCL, SDA, T, E> Write for I2cBB<SCL, SDA, T>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E> + ModeSwitch<Error = E>,
    T: Timing,
{
    type Error = Error<E>;

    fn write(&mut self, addr: u8, output: &[u8]) -> Result<(), Self::Error> {
        self.write_buffer(addr, output)
    }
}

impl<SCL, SDA, T, E> Read for I2cBB<SCL, SDA, T>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E> + ModeSwitch<Error = E>,
    T: Timing,
{
    type Error = Error<E>;

    fn read(&mut self, addr: u8, input: &mut [u8]) -> Result<(), Self::Error> {
        self.read_buffer(addr, input)
    }
}

/// Write transaction followed by a separate read transaction.
///
/// The bus goes back to idle in between: START is only issued on an idle
/// bus, so there is no repeated START.
impl<SCL, SDA, T, E> WriteRead for I2cBB<SCL, SDA, T>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E> + ModeSwitch<Error = E>,
    T: Timing,
{
    type Error = Error<E>;

    fn write_read(&mut self, addr: u8, output: &[u8], input: &mut [u8]) -> Result<(), Self::Error> {
        self.write_buffer(addr, output)?;
        self.read_buffer(addr, input)
    }
}

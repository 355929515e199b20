//! Simulated two-wire bus for tests.
//!
//! Both lines are pulled up and wired-AND: the master's data pin and the
//! peripheral can each hold the data line low. The peripheral decodes
//! START/STOP and bytes from the line edges, acknowledges its own address,
//! stores written bytes and clocks out queued bytes on reads.

use crate::pin::ModeSwitch;
use crate::timing::Timing;
use core::cell::RefCell;
use core::convert::Infallible;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

/// Bus condition as seen by the peripheral
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Event {
    Start,
    Stop,
    /// Master to peripheral, with the peripheral's acknowledge
    Write(u8, bool),
    /// Peripheral to master, with the master's acknowledge
    Read(u8, bool),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum State {
    Idle,
    Address,
    Receive,
    Transmit,
    Ignore,
}

pub struct Wire {
    scl: bool,
    sda_level: bool,
    sda_output: bool,
    lines: (bool, bool),

    address: u8,
    /// Index of the written data byte to refuse, counted over the whole test
    pub nack_data_at: Option<usize>,
    /// Queue every written data byte for reading back
    pub echo: bool,
    pub received: Vec<u8>,
    pub outgoing: VecDeque<u8>,
    pub events: Vec<Event>,
    /// Complete clock pulses (rise followed by fall)
    pub pulses: usize,

    state: State,
    rose: bool,
    bit: u8,
    shift: u8,
    current: u8,
    pull_low: bool,
    acked: bool,
    reading: bool,
    master_ack: bool,
}

impl Wire {
    fn sda_line(&self) -> bool {
        (!self.sda_output || self.sda_level) && !self.pull_low
    }

    /// Both lines released
    pub fn idle(&self) -> bool {
        self.lines == (true, true)
    }

    fn settle(&mut self) {
        let (prev_scl, prev_sda) = self.lines;
        let scl = self.scl;
        let sda = self.sda_line();
        self.lines = (scl, sda);

        if scl && prev_scl && sda != prev_sda {
            if sda {
                self.stop();
            } else {
                self.start();
            }
        } else if scl && !prev_scl {
            self.scl_rise(sda);
        } else if !scl && prev_scl {
            self.scl_fall();
            self.lines = (scl, self.sda_line());
        }
    }

    fn start(&mut self) {
        self.events.push(Event::Start);
        self.state = State::Address;
        self.rose = false;
        self.bit = 0;
        self.shift = 0;
        self.pull_low = false;
    }

    fn stop(&mut self) {
        self.events.push(Event::Stop);
        self.state = State::Idle;
        self.rose = false;
        self.pull_low = false;
    }

    fn scl_rise(&mut self, sda: bool) {
        self.rose = true;
        match self.state {
            State::Address | State::Receive if self.bit < 8 => {
                self.shift = (self.shift << 1) | sda as u8;
            }
            State::Transmit if self.bit == 8 => self.master_ack = !sda,
            _ => {}
        }
    }

    fn scl_fall(&mut self) {
        if !self.rose {
            return;
        }
        self.rose = false;
        self.pulses += 1;

        match self.state {
            State::Idle | State::Ignore => {}
            State::Address | State::Receive => {
                self.bit += 1;
                if self.bit == 8 {
                    let value = self.shift;
                    if self.state == State::Address {
                        self.acked = value >> 1 == self.address;
                        self.reading = value & 1 == 1;
                    } else {
                        self.acked = self.nack_data_at != Some(self.received.len());
                        self.received.push(value);
                        if self.echo {
                            self.outgoing.push_back(value);
                        }
                    }
                    self.events.push(Event::Write(value, self.acked));
                    self.pull_low = self.acked;
                } else if self.bit == 9 {
                    self.pull_low = false;
                    self.bit = 0;
                    self.shift = 0;
                    if !self.acked {
                        self.state = State::Ignore;
                    } else if self.state == State::Address && self.reading {
                        self.state = State::Transmit;
                        self.load_next();
                    } else {
                        self.state = State::Receive;
                    }
                }
            }
            State::Transmit => {
                self.bit += 1;
                if self.bit < 8 {
                    self.drive_bit();
                } else if self.bit == 8 {
                    self.pull_low = false;
                } else {
                    self.events.push(Event::Read(self.current, self.master_ack));
                    self.bit = 0;
                    if self.master_ack {
                        self.load_next();
                    } else {
                        self.state = State::Ignore;
                    }
                }
            }
        }
    }

    fn load_next(&mut self) {
        // an exhausted peripheral leaves the line released
        self.current = self.outgoing.pop_front().unwrap_or(0xFF);
        self.drive_bit();
    }

    fn drive_bit(&mut self) {
        self.pull_low = self.current & (0x80 >> self.bit) == 0;
    }
}

pub type Bus = Rc<RefCell<Wire>>;

/// A released bus with a peripheral at `address`
pub fn bus(address: u8) -> Bus {
    Rc::new(RefCell::new(Wire {
        scl: true,
        sda_level: true,
        sda_output: false,
        lines: (true, true),
        address,
        nack_data_at: None,
        echo: false,
        received: Vec::new(),
        outgoing: VecDeque::new(),
        events: Vec::new(),
        pulses: 0,
        state: State::Idle,
        rose: false,
        bit: 0,
        shift: 0,
        current: 0xFF,
        pull_low: false,
        acked: false,
        reading: false,
        master_ack: false,
    }))
}

/// Clock line driven by the master
pub struct Scl(pub Bus);

impl OutputPin for Scl {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.scl = false;
        wire.settle();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.scl = true;
        wire.settle();
        Ok(())
    }
}

/// Push-pull data pin with a switchable direction
pub struct Sda(pub Bus);

impl OutputPin for Sda {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.sda_level = false;
        wire.settle();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.sda_level = true;
        wire.settle();
        Ok(())
    }
}

impl InputPin for Sda {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.0.borrow().sda_line())
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

impl ModeSwitch for Sda {
    type Error = Infallible;

    fn set_input_pull_up(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.sda_output = false;
        wire.settle();
        Ok(())
    }

    fn set_output(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.sda_output = true;
        wire.settle();
        Ok(())
    }
}

/// Open-drain data pin: high releases, low pulls the line down
pub struct OpenDrainSda(pub Bus);

impl OutputPin for OpenDrainSda {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.sda_level = false;
        wire.sda_output = true;
        wire.settle();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0.borrow_mut();
        wire.sda_output = false;
        wire.settle();
        Ok(())
    }
}

impl InputPin for OpenDrainSda {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.0.borrow().sda_line())
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

/// Hold hook call counts
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Counted {
    pub start: usize,
    pub stop: usize,
    pub scl_low: usize,
    pub scl_high: usize,
    pub settle: usize,
}

impl Timing for Counted {
    fn start_hold(&mut self) {
        self.start += 1;
    }

    fn stop_hold(&mut self) {
        self.stop += 1;
    }

    fn scl_low_hold(&mut self) {
        self.scl_low += 1;
    }

    fn scl_high_hold(&mut self) {
        self.scl_high += 1;
    }

    fn input_settle(&mut self) {
        self.settle += 1;
    }
}

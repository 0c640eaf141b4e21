//! Host-side fakes for the hardware traits
//!
//! Every fake hands out cheap clones sharing one `Rc` state so a test can
//! move one copy into the code under test and inspect the other.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::vec::Vec;

use sensor_hub_hal::{
    BrokerSession, HumiditySensor, Inbound, Measurement, Monotonic, SessionOptions, WirelessLink,
};

use crate::sensor::SensorError;

// ---------------------------------------------------------------------------
// Digital output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[derive(Default)]
struct PinState {
    levels: RefCell<Vec<bool>>,
    fail: Cell<bool>,
}

/// Output pin that records every level written
#[derive(Clone, Default)]
pub struct RecordingPin {
    state: Rc<PinState>,
}

impl RecordingPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.state.levels.borrow().clone()
    }

    pub fn is_high(&self) -> bool {
        self.state.levels.borrow().last().copied().unwrap_or(false)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.fail.set(fail);
    }

    fn write(&mut self, high: bool) -> Result<(), PinFault> {
        if self.state.fail.get() {
            return Err(PinFault);
        }
        self.state.levels.borrow_mut().push(high);
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = PinFault;
}

impl embedded_hal::digital::OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Manually advanced clock; the paired [`ClockDelay`] advances it too
#[derive(Clone, Default)]
pub struct ManualClock {
    now_ns: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, ms: u64) {
        self.now_ns.set(ms * 1_000_000);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ns.set(self.now_ns.get() + ms * 1_000_000);
    }

    pub fn delay(&self) -> ClockDelay {
        ClockDelay {
            now_ns: self.now_ns.clone(),
        }
    }
}

impl Monotonic for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }
}

/// Async delay that completes immediately after advancing the shared clock
#[derive(Clone)]
pub struct ClockDelay {
    now_ns: Rc<Cell<u64>>,
}

impl embedded_hal_async::delay::DelayNs for ClockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(us) * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ms) * 1_000_000);
    }
}

// ---------------------------------------------------------------------------
// Wireless link
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRefused;

struct LinkState {
    up: Cell<bool>,
    accept_join: Cell<bool>,
    stay_down: Cell<bool>,
    joins: Cell<u32>,
    rssi: Cell<Option<i32>>,
}

/// Link that comes up as soon as a join is accepted
#[derive(Clone)]
pub struct FakeLink {
    state: Rc<LinkState>,
}

impl FakeLink {
    pub fn new() -> Self {
        Self {
            state: Rc::new(LinkState {
                up: Cell::new(false),
                accept_join: Cell::new(true),
                stay_down: Cell::new(false),
                joins: Cell::new(0),
                rssi: Cell::new(Some(-61)),
            }),
        }
    }

    pub fn accept_join(&self, accept: bool) {
        self.state.accept_join.set(accept);
    }

    /// Accept joins but never obtain an address
    pub fn stay_down(&self, down: bool) {
        self.state.stay_down.set(down);
    }

    pub fn set_up(&self, up: bool) {
        self.state.up.set(up);
    }

    pub fn joins(&self) -> u32 {
        self.state.joins.get()
    }

    pub fn set_rssi(&self, rssi: Option<i32>) {
        self.state.rssi.set(rssi);
    }
}

impl WirelessLink for FakeLink {
    type Error = JoinRefused;

    async fn join(&mut self, _ssid: &str, _password: &str) -> Result<(), Self::Error> {
        self.state.joins.set(self.state.joins.get() + 1);
        if self.state.accept_join.get() {
            self.state.up.set(!self.state.stay_down.get());
            Ok(())
        } else {
            Err(JoinRefused)
        }
    }

    fn is_up(&self) -> bool {
        self.state.up.get()
    }

    fn ipv4_address(&self) -> Option<Ipv4Addr> {
        self.state.up.get().then(|| Ipv4Addr::new(192, 168, 1, 42))
    }

    async fn rssi(&mut self) -> Option<i32> {
        if self.state.up.get() {
            self.state.rssi.get()
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Broker session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFault;

/// Scripted broker traffic, delivered one item per `poll`
enum Delivery {
    Message(String, Vec<u8>),
    PingResponse,
    Fault,
}

/// (topic, payload as text, retain)
pub type Published = (String, String, bool);

#[derive(Default)]
struct SessionState {
    connected: Cell<bool>,
    connects: Cell<u32>,
    closes: Cell<u32>,
    pings: Cell<u32>,
    refuse_connect: Cell<bool>,
    reject_subscribe: Cell<bool>,
    failing_publishes: Cell<u32>,
    options: RefCell<Option<(String, u16, Option<String>, Option<String>)>>,
    subscriptions: RefCell<Vec<String>>,
    published: RefCell<Vec<Published>>,
    inbound: RefCell<VecDeque<Delivery>>,
}

/// Broker session that records what the node sends and replays a script
///
/// Every operation on a closed session fails, like a dead socket.
#[derive(Clone, Default)]
pub struct FakeSession {
    state: Rc<SessionState>,
    current: Option<(String, Vec<u8>)>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.get()
    }

    pub fn connects(&self) -> u32 {
        self.state.connects.get()
    }

    pub fn closes(&self) -> u32 {
        self.state.closes.get()
    }

    pub fn pings(&self) -> u32 {
        self.state.pings.get()
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.state.refuse_connect.set(refuse);
    }

    pub fn reject_subscribe(&self, reject: bool) {
        self.state.reject_subscribe.set(reject);
    }

    /// Fail the next `count` publishes
    pub fn fail_publishes(&self, count: u32) {
        self.state.failing_publishes.set(count);
    }

    /// (client id, keep-alive, username, password) of the last connect
    pub fn last_options(&self) -> Option<(String, u16, Option<String>, Option<String>)> {
        self.state.options.borrow().clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state.subscriptions.borrow().clone()
    }

    pub fn take_published(&self) -> Vec<Published> {
        core::mem::take(&mut *self.state.published.borrow_mut())
    }

    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        self.state
            .inbound
            .borrow_mut()
            .push_back(Delivery::Message(topic.to_owned(), payload.to_vec()));
    }

    pub fn deliver_ping_response(&self) {
        self.state
            .inbound
            .borrow_mut()
            .push_back(Delivery::PingResponse);
    }

    /// Next poll fails as if the connection dropped
    pub fn deliver_fault(&self) {
        self.state.inbound.borrow_mut().push_back(Delivery::Fault);
    }

    fn ensure_connected(&self) -> Result<(), SessionFault> {
        if self.state.connected.get() {
            Ok(())
        } else {
            Err(SessionFault)
        }
    }
}

impl BrokerSession for FakeSession {
    type Error = SessionFault;

    async fn connect(
        &mut self,
        _host: &str,
        _port: u16,
        options: &SessionOptions<'_>,
    ) -> Result<(), Self::Error> {
        let state = &self.state;
        state.connects.set(state.connects.get() + 1);
        *state.options.borrow_mut() = Some((
            options.client_id.to_owned(),
            options.keep_alive_secs,
            options.username.map(str::to_owned),
            options.password.map(str::to_owned),
        ));
        if state.refuse_connect.get() {
            return Err(SessionFault);
        }
        state.connected.set(true);
        Ok(())
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), Self::Error> {
        self.ensure_connected()?;
        if self.state.reject_subscribe.get() {
            return Err(SessionFault);
        }
        self.state.subscriptions.borrow_mut().push(filter.to_owned());
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Self::Error> {
        self.ensure_connected()?;
        let failing = self.state.failing_publishes.get();
        if failing > 0 {
            self.state.failing_publishes.set(failing - 1);
            return Err(SessionFault);
        }
        let text = String::from_utf8_lossy(payload).into_owned();
        self.state
            .published
            .borrow_mut()
            .push((topic.to_owned(), text, retain));
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), Self::Error> {
        self.ensure_connected()?;
        self.state.pings.set(self.state.pings.get() + 1);
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<Inbound<'_>>, Self::Error> {
        self.ensure_connected()?;
        let next = self.state.inbound.borrow_mut().pop_front();
        match next {
            None => Ok(None),
            Some(Delivery::PingResponse) => Ok(Some(Inbound::PingResponse)),
            Some(Delivery::Fault) => Err(SessionFault),
            Some(Delivery::Message(topic, payload)) => {
                let (topic, payload) = &*self.current.insert((topic, payload));
                Ok(Some(Inbound::Message { topic, payload }))
            }
        }
    }

    fn close(&mut self) {
        self.state.closes.set(self.state.closes.get() + 1);
        self.state.connected.set(false);
    }
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Sensor returning a fixed result on every read
#[derive(Clone)]
pub struct FakeSensor {
    next: Rc<Cell<Result<Measurement, SensorError>>>,
    reads: Rc<Cell<u32>>,
}

impl FakeSensor {
    pub fn new(temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            next: Rc::new(Cell::new(Ok(Measurement {
                temperature_c,
                humidity_pct,
            }))),
            reads: Rc::new(Cell::new(0)),
        }
    }

    pub fn set(&self, result: Result<Measurement, SensorError>) {
        self.next.set(result);
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl HumiditySensor for FakeSensor {
    type Error = SensorError;

    fn read(&mut self) -> Result<Measurement, Self::Error> {
        self.reads.set(self.reads.get() + 1);
        self.next.get()
    }
}

// ---------------------------------------------------------------------------
// Single-wire bus simulation for the DHT driver
// ---------------------------------------------------------------------------

struct WireState {
    now_ns: Cell<u64>,
    host_low: Cell<bool>,
    released_at_ns: Cell<u64>,
    /// (duration in µs, line level) segments played after release
    waveform: RefCell<Vec<(u32, bool)>>,
}

/// A DHT sensor on a pulled-up data line, played back in simulated time
#[derive(Clone)]
pub struct SimWire {
    state: Rc<WireState>,
}

impl SimWire {
    /// Sensor that answers every start pulse with `frame`
    pub fn responding(frame: [u8; 5]) -> Self {
        let mut waveform = vec![(30, true), (80, false), (80, true)];
        for byte in frame {
            for bit in (0..8).rev() {
                let one = byte & (1 << bit) != 0;
                waveform.push((50, false));
                waveform.push((if one { 70 } else { 26 }, true));
            }
        }
        waveform.push((50, false));
        Self::with_waveform(waveform)
    }

    /// Line that nobody pulls low
    pub fn silent() -> Self {
        Self::with_waveform(Vec::new())
    }

    fn with_waveform(waveform: Vec<(u32, bool)>) -> Self {
        Self {
            state: Rc::new(WireState {
                now_ns: Cell::new(0),
                host_low: Cell::new(false),
                released_at_ns: Cell::new(0),
                waveform: RefCell::new(waveform),
            }),
        }
    }

    pub fn pin(&self) -> SimPin {
        SimPin {
            wire: self.clone(),
        }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            wire: self.clone(),
        }
    }

    fn level(&self) -> bool {
        if self.state.host_low.get() {
            return false;
        }
        let elapsed_us = (self.state.now_ns.get() - self.state.released_at_ns.get()) / 1_000;
        let mut start = 0u64;
        for &(duration, level) in self.state.waveform.borrow().iter() {
            let end = start + u64::from(duration);
            if elapsed_us < end {
                return level;
            }
            start = end;
        }
        true
    }
}

pub struct SimPin {
    wire: SimWire,
}

impl embedded_hal::digital::ErrorType for SimPin {
    type Error = PinFault;
}

impl embedded_hal::digital::InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.wire.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.wire.level())
    }
}

impl embedded_hal::digital::OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.wire.state.host_low.set(true);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let state = &self.wire.state;
        if state.host_low.replace(false) {
            state.released_at_ns.set(state.now_ns.get());
        }
        Ok(())
    }
}

pub struct SimDelay {
    wire: SimWire,
}

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let now = &self.wire.state.now_ns;
        now.set(now.get() + u64::from(ns));
    }
}

use super::send_flags::Flags;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

pub type DynFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaliFrame {
    Frame8(u8),
    Frame16([u8; 2]),
}

impl DaliFrame {
    pub fn bit_length(&self) -> usize {
        match self {
            DaliFrame::Frame8(_) => 8,
            DaliFrame::Frame16(_) => 16,
        }
    }
}

impl fmt::Display for DaliFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaliFrame::Frame8(b) => write!(f, "{:02x}", b),
            DaliFrame::Frame16([a, b]) => write!(f, "{:02x} {:02x}", a, b),
        }
    }
}

/// Outcome of a single bus transaction
#[derive(Debug)]
pub enum DaliSendResult {
    /// Sent, no answer expected
    Ok,
    /// Backward frame received
    Answer(u8),
    /// No answer within the answer window
    Timeout,
    /// Garbled answer, usually several gears answering at once
    Framing,
    DriverError(Box<dyn Error + Send + Sync>),
}

impl DaliSendResult {
    /// Convert to `Ok` if an answer was received.
    pub fn check_answer(self) -> Result<u8, DaliSendResult> {
        match self {
            DaliSendResult::Answer(a) => Ok(a),
            e => Err(e),
        }
    }

    /// Convert to `Ok` if the frame was sent.
    pub fn check_send(self) -> Result<(), DaliSendResult> {
        match self {
            DaliSendResult::Ok | DaliSendResult::Answer(_) => Ok(()),
            e => Err(e),
        }
    }
}

impl fmt::Display for DaliSendResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaliSendResult::Ok => write!(f, "OK"),
            DaliSendResult::Answer(a) => write!(f, "Answer: 0x{:02x}", a),
            DaliSendResult::Timeout => write!(f, "Timeout"),
            DaliSendResult::Framing => write!(f, "Framing error"),
            DaliSendResult::DriverError(e) => write!(f, "Driver error: {}", e),
        }
    }
}

impl Error for DaliSendResult {}

pub trait DaliDriver: Send {
    /// Send a frame on the bus and wait for the result
    fn send_frame(&mut self, cmd: DaliFrame, flags: Flags) -> DynFuture<'_, DaliSendResult>;
}

#[derive(Debug)]
pub enum OpenError {
    NotFound,
    ParameterError(String),
    DriverError(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::NotFound => write!(f, "Driver not found"),
            OpenError::ParameterError(msg) => write!(f, "Invalid driver parameter: {}", msg),
            OpenError::DriverError(e) => write!(f, "Driver error: {}", e),
        }
    }
}

impl Error for OpenError {}

pub type OpenFn = fn(HashMap<String, String>) -> Result<Box<dyn DaliDriver>, OpenError>;

#[derive(Clone)]
pub struct DriverInfo {
    pub name: String,
    pub description: String,
    pub open: OpenFn,
}

lazy_static! {
    static ref DRIVERS: Mutex<Vec<DriverInfo>> = Mutex::new(Vec::new());
}

/// Register a driver. A driver with the same name is replaced.
pub fn add_driver(info: DriverInfo) {
    let mut drivers = DRIVERS.lock().unwrap_or_else(|e| e.into_inner());
    drivers.retain(|d| !d.name.eq_ignore_ascii_case(&info.name));
    drivers.push(info);
}

pub fn driver_names() -> Vec<String> {
    let drivers = DRIVERS.lock().unwrap_or_else(|e| e.into_inner());
    drivers.iter().map(|d| d.name.clone()).collect()
}

/// Split `NAME[:key=value,...]` into a driver name and its parameters
fn parse_driver_spec(spec: &str) -> Result<(&str, HashMap<String, String>), OpenError> {
    let (name, params_str) = match spec.split_once(':') {
        Some((name, params)) => (name, params),
        None => (spec, ""),
    };
    let mut params = HashMap::new();
    for param in params_str.split(',').filter(|p| !p.trim().is_empty()) {
        let Some((key, value)) = param.split_once('=') else {
            return Err(OpenError::ParameterError(format!(
                "Expected key=value, got \"{}\"",
                param
            )));
        };
        params.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok((name.trim(), params))
}

/// Open a driver by name.
///
/// `spec` is the driver name optionally followed by a colon and comma
/// separated parameters, e.g. `SIMULATOR:count=4`. The name `default`
/// selects the first registered driver.
pub fn open(spec: &str) -> Result<Box<dyn DaliDriver>, OpenError> {
    let (name, params) = parse_driver_spec(spec)?;
    let info = {
        let drivers = DRIVERS.lock().unwrap_or_else(|e| e.into_inner());
        let found = if name.eq_ignore_ascii_case("default") {
            drivers.first()
        } else {
            drivers.iter().find(|d| d.name.eq_ignore_ascii_case(name))
        };
        found.cloned().ok_or(OpenError::NotFound)?
    };
    (info.open)(params)
}

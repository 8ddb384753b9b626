use crate::drivers;
use crate::drivers::driver::DynFuture;
use drivers::driver::{DaliDriver, DaliFrame, DaliSendResult, DriverInfo, OpenError};
use drivers::send_flags::Flags;
use futures::executor::block_on;
use log::{debug, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_serial::{Parity, SerialStream};

const MSG_LEN: usize = 8;
const REPLY_TIMEOUT: Duration = Duration::from_millis(1000);
// Partial messages older than this are discarded
const STALE_RX: Duration = Duration::from_millis(200);

#[derive(Debug)]
enum DriverError {
    CommandError,
    SerialError(tokio_serial::Error),
}

impl Error for DriverError {}

impl From<tokio_serial::Error> for DriverError {
    fn from(err: tokio_serial::Error) -> DriverError {
        DriverError::SerialError(err)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::CommandError => write!(f, "Command error"),
            DriverError::SerialError(err) => write!(f, "{}", err),
        }
    }
}

struct DaliRequest {
    frame: DaliFrame,
    flags: Flags,
    reply: oneshot::Sender<DaliSendResult>,
}

/// Build the 8 byte message sent to the adapter
fn encode_request(seq: u8, frame: &DaliFrame, flags: Flags) -> [u8; MSG_LEN] {
    let mut bytes = [
        seq,
        (if flags.expect_answer() { 0b1 } else { 0 }) | (if flags.send_twice() { 0b10 } else { 0 }),
        flags.priority() as u8 | (2 << 3),
        frame.bit_length() as u8,
        0,
        0,
        0,
        0,
    ];
    match frame {
        DaliFrame::Frame8(d) => bytes[4] = *d,
        DaliFrame::Frame16(d) => {
            bytes[4] = d[0];
            bytes[5] = d[1];
        }
    }
    bytes
}

/// Decode a reply from the adapter into its sequence number and result.
/// Messages with sequence number 0 are bus monitor events and ignored.
fn decode_reply(bytes: &[u8; MSG_LEN]) -> Option<(u8, DaliSendResult)> {
    if bytes[0] == 0 {
        return None;
    }
    let result = match bytes[1] {
        2 => DaliSendResult::Ok,
        3 => DaliSendResult::Answer(bytes[4]),
        6 => DaliSendResult::Framing,
        10 => DaliSendResult::Timeout,
        _ => return None,
    };
    Some((bytes[0], result))
}

async fn driver_thread(
    mut serial: SerialStream,
    mut recv: mpsc::Receiver<DaliRequest>,
) -> Result<(), DriverError> {
    let mut req_timeout = None;
    let mut ser_rx_buf = [0u8; 16];
    let mut ser_rx_pos = 0;
    let mut last_rx_time = Instant::now();
    let mut next_seq = 1u8;
    let mut current_req: Option<(u8, DaliRequest)> = None;
    loop {
        select! {
            req = recv.recv(), if current_req.is_none() => {
                let Some(req) = req else {
                    break
                };
                let bytes = encode_request(next_seq, &req.frame, req.flags);
                if let Err(e) = serial.write_all(&bytes).await {
                    let _ = req.reply.send(DaliSendResult::DriverError(
                        format!("Failed to write to serial device: {}", e).into()));
                    continue;
                }
                current_req = Some((next_seq, req));
                next_seq = if next_seq < 0xff { next_seq + 1 } else { 1u8 };
                req_timeout = Some(Box::pin(tokio::time::sleep(REPLY_TIMEOUT)));
            },
            _ = async {
                if let Some(ref mut timeout) = req_timeout {
                    timeout.await;
                }
            }, if req_timeout.is_some() => {
                if let Some((_seq, req)) = current_req.take() {
                    let _ = req.reply.send(DaliSendResult::Timeout);
                }
                req_timeout = None;
            },
            r = serial.read(&mut ser_rx_buf[ser_rx_pos..]) => {
                let n = match r {
                    Ok(n) => n,
                    Err(e) => {
                        warn!("Serial read failed: {}", e);
                        continue;
                    }
                };
                let now = Instant::now();
                if now - last_rx_time > STALE_RX && ser_rx_pos > 0 {
                    ser_rx_buf.copy_within(ser_rx_pos.., 0);
                    ser_rx_pos = 0;
                }
                last_rx_time = now;
                ser_rx_pos += n;
                while ser_rx_pos >= MSG_LEN {
                    let mut msg = [0u8; MSG_LEN];
                    msg.copy_from_slice(&ser_rx_buf[..MSG_LEN]);
                    debug!("Reply: {:?}", msg);
                    if let Some((seq, result)) = decode_reply(&msg) {
                        if matches!(&current_req, Some((s, _)) if *s == seq) {
                            if let Some((_, req)) = current_req.take() {
                                let _ = req.reply.send(result);
                            }
                            req_timeout = None;
                        }
                    }
                    ser_rx_buf.copy_within(MSG_LEN.., 0);
                    ser_rx_pos -= MSG_LEN;
                }
            }
        }
    }
    Ok(())
}

fn driver_open(params: HashMap<String, String>) -> Result<Box<dyn DaliDriver>, OpenError> {
    let port = params
        .get("port")
        .map(|s| s.as_str())
        .unwrap_or("/dev/ttyACM0");
    let baud_rate = match params.get("baud_rate") {
        None => 9600,
        Some(s) => u32::from_str(s)
            .map_err(|_| OpenError::ParameterError("baud_rate has invalid value".to_string()))?,
    };
    let parity = match params.get("parity") {
        Some(p) if !p.is_empty() => match &p[..1] {
            "E" | "e" => Parity::Even,
            "O" | "o" => Parity::Odd,
            "N" | "n" => Parity::None,
            _ => {
                return Err(OpenError::ParameterError(
                    "parity has invalid value".to_string(),
                ));
            }
        },
        Some(_) | None => Parity::Even,
    };
    match DaliRpiDriver::new(port, baud_rate, parity) {
        Err(e) => Err(OpenError::DriverError(Box::new(e))),
        Ok(d) => Ok(Box::new(d)),
    }
}

pub struct DaliRpiDriver {
    join: Option<JoinHandle<Result<(), DriverError>>>,
    // Needs to be an option so that it can be dropped to signal the receiver
    send_cmd: Option<mpsc::Sender<DaliRequest>>,
}

impl DaliRpiDriver {
    fn new(port: &str, baud_rate: u32, parity: Parity) -> Result<DaliRpiDriver, DriverError> {
        let (tx, rx) = mpsc::channel::<DaliRequest>(10);
        let serial = SerialStream::open(&tokio_serial::new(port, baud_rate).parity(parity))?;
        let join = tokio::spawn(driver_thread(serial, rx));
        Ok(DaliRpiDriver {
            join: Some(join),
            send_cmd: Some(tx),
        })
    }
}

impl DaliDriver for DaliRpiDriver {
    fn send_frame(&mut self, cmd: DaliFrame, flags: Flags) -> DynFuture<'_, DaliSendResult> {
        if !matches!(cmd, DaliFrame::Frame16(_)) {
            return Box::pin(std::future::ready(DaliSendResult::DriverError(
                "Only 16-bit frames supported when sending".into(),
            )));
        }
        let (tx, rx) = oneshot::channel();
        let req = DaliRequest {
            frame: cmd,
            flags,
            reply: tx,
        };
        let queued = match self.send_cmd.as_mut() {
            Some(send) => send.try_send(req).is_ok(),
            None => false,
        };
        if queued {
            Box::pin(async {
                match rx.await {
                    Ok(r) => r,
                    Err(e) => DaliSendResult::DriverError(Box::new(e)),
                }
            })
        } else {
            Box::pin(async { DaliSendResult::DriverError(Box::new(DriverError::CommandError)) })
        }
    }
}

impl Drop for DaliRpiDriver {
    fn drop(&mut self) {
        if self.send_cmd.take().is_some() {
            if let Some(join) = self.join.take() {
                let _ = block_on(join);
            }
        }
    }
}

pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "DALI_RPI".to_string(),
        description: "Driver for DALI on Raspberry Pi Pico".to_string(),
        open: driver_open,
    }
}

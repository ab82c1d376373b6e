//! Live capture from a network interface.

use std::fmt;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use pnet_datalink::{self, Channel, Config, DataLinkReceiver, MacAddr, NetworkInterface};
use tracing::{info, trace};

use crate::capture::{CaptureSource, CapturedFrame, StopFlag};
use crate::error::CaptureError;
use crate::link::LinkLayer;

/// Idle read timeout; bounds how long a stop request can go unnoticed.
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const READ_BUFFER_SIZE: usize = 65536;

/// Capture source reading frames from a network interface.
pub struct LiveCapture {
    device: String,
    link_layer: LinkLayer,
    receiver: Box<dyn DataLinkReceiver>,
    stop: StopFlag,
}

impl fmt::Debug for LiveCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCapture")
            .field("device", &self.device)
            .field("link_layer", &self.link_layer)
            .finish_non_exhaustive()
    }
}

impl LiveCapture {
    /// Opens a capture on `device`.
    ///
    /// # Errors
    /// - [`CaptureError::DeviceNotFound`] if no interface has that name.
    /// - [`CaptureError::Open`] if the channel cannot be opened, typically
    ///   for lack of privileges.
    pub fn open(device: &str, stop: StopFlag) -> Result<Self, CaptureError> {
        let interface = pnet_datalink::interfaces()
            .into_iter()
            .find(|interface| interface.name == device)
            .ok_or_else(|| CaptureError::DeviceNotFound(device.to_string()))?;
        let link_layer = interface_link_layer(&interface);

        let config = Config {
            read_timeout: Some(READ_TIMEOUT),
            read_buffer_size: READ_BUFFER_SIZE,
            ..Default::default()
        };
        let open_error = |source| CaptureError::Open {
            device: device.to_string(),
            source,
        };
        let receiver = match pnet_datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(_, receiver)) => receiver,
            Ok(_) => {
                return Err(open_error(io::Error::other("unsupported channel type")));
            }
            Err(e) => return Err(open_error(e)),
        };

        info!(device, %link_layer, "capture opened");
        Ok(Self {
            device: device.to_string(),
            link_layer,
            receiver,
            stop,
        })
    }
}

/// Interfaces without a hardware address (tun devices and the like) deliver
/// raw IP; everything else is Ethernet framed.
fn interface_link_layer(interface: &NetworkInterface) -> LinkLayer {
    let has_hardware_address = interface.mac.is_some_and(|mac| mac != MacAddr::zero());
    if interface.is_loopback() || has_hardware_address {
        LinkLayer::Ethernet
    } else {
        LinkLayer::Raw
    }
}

impl CaptureSource for LiveCapture {
    fn link_layer(&self) -> LinkLayer {
        self.link_layer
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        loop {
            if self.stop.is_stop_requested() {
                return Ok(None);
            }
            match self.receiver.next() {
                Ok(data) => {
                    let now = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default();
                    let ts_sec = u32::try_from(now.as_secs()).unwrap_or(u32::MAX);
                    return Ok(Some(CapturedFrame::new(
                        Bytes::copy_from_slice(data),
                        ts_sec,
                        now.subsec_micros(),
                    )));
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    trace!(device = %self.device, "capture idle");
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(CaptureError::Read(e)),
            }
        }
    }
}

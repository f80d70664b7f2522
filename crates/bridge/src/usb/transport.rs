//! libusb transport
//!
//! Drives still-image class devices over their bulk pipes. Device paths are
//! `usb:BBB:AAA` (bus and address, zero padded); the friendly name is the
//! device's product string.
//!
//! Events a device pushes during a session, on the interrupt pipe or
//! between containers on the bulk pipe, are written to stderr one line
//! each.

use super::usb_error;
use protocol::codes::{operation, response};
use protocol::container::{
    self, ContainerKind, HEADER_LEN, decode_header, decode_params, encode_command, encode_data,
};
use protocol::{
    DataPhase, DeviceNotice, Request, Response, Transport, TransportError, TransportSession,
};
use rusb::{Context, Device, DeviceHandle, Direction, TransferType, UsbContext};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Path prefix of every device path this transport reports
pub const PATH_PREFIX: &str = "usb:";

/// USB interface class of still-image (PTP/MTP) functions
const STILL_IMAGE_CLASS: u8 = 0x06;

/// libusb treats a zero timeout as "wait forever"
const NO_TIMEOUT: Duration = Duration::ZERO;

/// Session id used for OpenSession
const SESSION_ID: u32 = 1;

/// Size of a single bulk read
const READ_CHUNK: usize = 64 * 1024;

/// Wait for a pending interrupt packet; zero would block forever
const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// Upper bound on interrupt packets drained after one transaction
const MAX_EVENTS_PER_POLL: usize = 16;

/// Bulk endpoints of a still-image interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StillImageInterface {
    number: u8,
    bulk_in: u8,
    bulk_out: u8,
    interrupt_in: Option<u8>,
    max_packet_size: usize,
}

/// rusb-backed transport
pub struct UsbTransport {
    context: Context,
}

impl UsbTransport {
    pub fn new() -> Result<Self, rusb::Error> {
        Ok(Self {
            context: Context::new()?,
        })
    }

    /// libusb context, shared with the hotplug source
    pub fn context(&self) -> &Context {
        &self.context
    }

    fn find_device(&self, path: &str) -> Result<Device<Context>, TransportError> {
        let (bus, address) = parse_path(path)?;
        self.context
            .devices()
            .map_err(usb_error)?
            .iter()
            .find(|d| d.bus_number() == bus && d.address() == address)
            .ok_or(TransportError::NotFound)
    }
}

impl Transport for UsbTransport {
    type Session = UsbSession;

    fn path_prefix(&self) -> &str {
        PATH_PREFIX
    }

    fn device_paths(&mut self) -> Result<Vec<String>, TransportError> {
        let devices = self.context.devices().map_err(usb_error)?;
        let paths: Vec<String> = devices
            .iter()
            .filter(|d| still_image_interface(d).is_some())
            .map(|d| format_path(d.bus_number(), d.address()))
            .collect();

        trace!("Enumerated {} still-image devices", paths.len());
        Ok(paths)
    }

    fn friendly_name(&mut self, path: &str) -> Option<String> {
        let device = self.find_device(path).ok()?;
        let descriptor = device.device_descriptor().ok()?;
        let handle = device
            .open()
            .map_err(|e| debug!("Cannot open {} to read its name: {}", path, e))
            .ok()?;
        handle.read_product_string_ascii(&descriptor).ok()
    }

    fn open(&mut self, path: &str) -> Result<UsbSession, TransportError> {
        let device = self.find_device(path)?;
        let interface = still_image_interface(&device).ok_or(TransportError::NotFound)?;
        let handle = device.open().map_err(usb_error)?;

        // not supported on every platform
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!("Auto-detach of kernel driver unavailable: {}", e);
        }
        handle.claim_interface(interface.number).map_err(usb_error)?;
        debug!("Claimed interface {} on {}", interface.number, path);

        let mut session = UsbSession {
            pipe: UsbPipe { handle, interface },
            transaction_id: 0,
        };

        let result = session.execute(&Request::new(operation::OPEN_SESSION, vec![SESSION_ID]));
        accept_open_session(&mut session.pipe, path, result)?;
        Ok(session)
    }
}

/// Check the OpenSession outcome, releasing the interface on any failure
fn accept_open_session(
    pipe: &mut impl BulkPipe,
    path: &str,
    result: Result<Response, TransportError>,
) -> Result<(), TransportError> {
    let outcome = result.and_then(|reply| match reply.code {
        response::OK => Ok(()),
        response::SESSION_ALREADY_OPEN => {
            debug!("Session already open on {}", path);
            Ok(())
        }
        code => Err(TransportError::Communication(format!(
            "OpenSession answered {:04X}",
            code
        ))),
    });
    if outcome.is_err() {
        pipe.release();
    }
    outcome
}

/// An open PTP session on one device
pub struct UsbSession {
    pipe: UsbPipe,
    transaction_id: u32,
}

impl TransportSession for UsbSession {
    fn execute(&mut self, request: &Request) -> Result<Response, TransportError> {
        // OpenSession itself is transaction 0
        let transaction_id = if request.code == operation::OPEN_SESSION {
            0
        } else {
            self.transaction_id = self.transaction_id.wrapping_add(1).max(1);
            self.transaction_id
        };

        let mut notices = Vec::new();
        let result = run_transaction(&mut self.pipe, transaction_id, request, &mut notices);
        poll_events(&mut self.pipe, &mut notices);
        report_notices(&notices, &mut std::io::stderr().lock());
        result
    }

    fn close(mut self) -> Result<(), TransportError> {
        let result = self
            .execute(&Request::new(operation::CLOSE_SESSION, vec![]))
            .and_then(|reply| match reply.code {
                response::OK | response::SESSION_NOT_OPEN => Ok(()),
                code => Err(TransportError::Communication(format!(
                    "CloseSession answered {:04X}",
                    code
                ))),
            });
        self.pipe.release();
        result
    }
}

/// Raw bulk I/O for one transaction
trait BulkPipe {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
    fn max_packet_size(&self) -> usize;
    /// Next pending event packet, if any
    fn poll_event(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
    fn release(&mut self);
}

struct UsbPipe {
    handle: DeviceHandle<Context>,
    interface: StillImageInterface,
}

impl BulkPipe for UsbPipe {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.handle
            .write_bulk(self.interface.bulk_out, bytes, NO_TIMEOUT)
            .map_err(usb_error)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.handle
            .read_bulk(self.interface.bulk_in, buf, NO_TIMEOUT)
            .map_err(usb_error)
    }

    fn max_packet_size(&self) -> usize {
        self.interface.max_packet_size
    }

    fn poll_event(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(endpoint) = self.interface.interrupt_in else {
            return Ok(None);
        };
        let mut buf = [0u8; 64];
        match self.handle.read_interrupt(endpoint, &mut buf, EVENT_POLL_TIMEOUT) {
            Ok(0) | Err(rusb::Error::Timeout) => Ok(None),
            Ok(n) => Ok(Some(buf[..n].to_vec())),
            Err(e) => Err(usb_error(e)),
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface.number) {
            warn!("Failed to release interface {}: {}", self.interface.number, e);
        }
    }
}

/// Command phase, optional data phase, response phase
fn run_transaction(
    pipe: &mut impl BulkPipe,
    transaction_id: u32,
    request: &Request,
    notices: &mut Vec<DeviceNotice>,
) -> Result<Response, TransportError> {
    let command = encode_command(request.code, transaction_id, &request.params)?;
    write_all(pipe, &command)?;

    if let DataPhase::Write(payload) = &request.data {
        let data = encode_data(request.code, transaction_id, payload)?;
        write_all(pipe, &data)?;
        // a transfer ending on a packet boundary needs a zero-length packet
        if data.len() % pipe.max_packet_size() == 0 {
            pipe.write(&[])?;
        }
    }

    let mut data = Vec::new();
    loop {
        let (header, payload) = read_container(pipe)?;
        if header.transaction_id != transaction_id && header.kind != ContainerKind::Event {
            return Err(TransportError::Malformed(format!(
                "transaction {} answered as {}",
                transaction_id, header.transaction_id
            )));
        }

        match header.kind {
            ContainerKind::Data => data = payload,
            ContainerKind::Response => {
                return Ok(Response {
                    code: header.code,
                    params: decode_params(&payload),
                    data,
                });
            }
            ContainerKind::Event => {
                notices.push(DeviceNotice::from_container(&header, &payload));
            }
            ContainerKind::Command => {
                return Err(TransportError::Malformed(
                    "device sent a command container".to_string(),
                ));
            }
        }
    }
}

/// Drain event packets queued on the interrupt pipe
fn poll_events(pipe: &mut impl BulkPipe, notices: &mut Vec<DeviceNotice>) {
    for _ in 0..MAX_EVENTS_PER_POLL {
        match pipe.poll_event() {
            Ok(Some(packet)) => match DeviceNotice::decode(&packet) {
                Ok(notice) => notices.push(notice),
                Err(e) => debug!("Discarding interrupt packet: {}", e),
            },
            Ok(None) => return,
            Err(e) => {
                debug!("Event poll failed: {}", e);
                return;
            }
        }
    }
}

fn report_notices(notices: &[DeviceNotice], out: &mut impl Write) {
    for notice in notices {
        if let Err(e) = writeln!(out, "{}", notice) {
            warn!("Failed to report device event: {}", e);
            return;
        }
    }
}

fn write_all(pipe: &mut impl BulkPipe, mut bytes: &[u8]) -> Result<(), TransportError> {
    while !bytes.is_empty() {
        let written = pipe.write(bytes)?;
        if written == 0 {
            return Err(TransportError::Communication("bulk write stalled".to_string()));
        }
        bytes = &bytes[written..];
    }
    Ok(())
}

/// Read one container, skipping zero-length packets between containers
fn read_container(
    pipe: &mut impl BulkPipe,
) -> Result<(container::ContainerHeader, Vec<u8>), TransportError> {
    let mut chunk = vec![0u8; READ_CHUNK];

    let mut received = loop {
        let n = pipe.read(&mut chunk)?;
        if n > 0 {
            break chunk[..n].to_vec();
        }
    };

    let header = decode_header(&received)?;
    let total = header.length as usize;
    while received.len() < total {
        let n = pipe.read(&mut chunk)?;
        if n == 0 {
            return Err(TransportError::Malformed(format!(
                "container truncated at {} of {} bytes",
                received.len(),
                total
            )));
        }
        received.extend_from_slice(&chunk[..n]);
    }
    received.truncate(total);

    Ok((header, received.split_off(HEADER_LEN)))
}

fn still_image_interface<T: UsbContext>(device: &Device<T>) -> Option<StillImageInterface> {
    let config = device.active_config_descriptor().ok()?;

    for interface in config.interfaces() {
        for alt in interface.descriptors() {
            if alt.class_code() != STILL_IMAGE_CLASS {
                continue;
            }

            let mut bulk_in = None;
            let mut bulk_out = None;
            let mut interrupt_in = None;
            let mut max_packet_size = 512;
            for endpoint in alt.endpoint_descriptors() {
                if endpoint.transfer_type() == TransferType::Interrupt
                    && endpoint.direction() == Direction::In
                {
                    interrupt_in = Some(endpoint.address());
                }
                if endpoint.transfer_type() != TransferType::Bulk {
                    continue;
                }
                match endpoint.direction() {
                    Direction::In => bulk_in = Some(endpoint.address()),
                    Direction::Out => {
                        bulk_out = Some(endpoint.address());
                        max_packet_size = usize::from(endpoint.max_packet_size()).max(1);
                    }
                }
            }

            if let (Some(bulk_in), Some(bulk_out)) = (bulk_in, bulk_out) {
                return Some(StillImageInterface {
                    number: alt.interface_number(),
                    bulk_in,
                    bulk_out,
                    interrupt_in,
                    max_packet_size,
                });
            }
        }
    }
    None
}

fn format_path(bus: u8, address: u8) -> String {
    format!("{}{:03}:{:03}", PATH_PREFIX, bus, address)
}

fn parse_path(path: &str) -> Result<(u8, u8), TransportError> {
    let invalid = || TransportError::InvalidArgument(format!("bad device path '{}'", path));
    let rest = path.strip_prefix(PATH_PREFIX).ok_or_else(invalid)?;
    let (bus, address) = rest.split_once(':').ok_or_else(invalid)?;
    Ok((
        bus.parse().map_err(|_| invalid())?,
        address.parse().map_err(|_| invalid())?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use protocol::codes::event;
    use std::collections::VecDeque;

    /// Scripted bulk pipe: records writes, replays reads
    struct ScriptedPipe {
        written: Vec<Vec<u8>>,
        reads: VecDeque<Vec<u8>>,
        events: VecDeque<Vec<u8>>,
        max_packet_size: usize,
        released: bool,
    }

    impl ScriptedPipe {
        fn new(reads: Vec<Vec<u8>>) -> Self {
            Self {
                written: Vec::new(),
                reads: reads.into(),
                events: VecDeque::new(),
                max_packet_size: 512,
                released: false,
            }
        }
    }

    impl BulkPipe for ScriptedPipe {
        fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
            self.written.push(bytes.to_vec());
            Ok(bytes.len())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            let next = self
                .reads
                .pop_front()
                .ok_or_else(|| TransportError::Communication("no more data".to_string()))?;
            buf[..next.len()].copy_from_slice(&next);
            Ok(next.len())
        }

        fn max_packet_size(&self) -> usize {
            self.max_packet_size
        }

        fn poll_event(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(self.events.pop_front())
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    fn container(kind: u16, code: u16, transaction_id: u32, params: &[u32]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u32_le((HEADER_LEN + params.len() * 4) as u32);
        buf.put_u16_le(kind);
        buf.put_u16_le(code);
        buf.put_u32_le(transaction_id);
        for p in params {
            buf.put_u32_le(*p);
        }
        buf
    }

    fn response_container(code: u16, transaction_id: u32, params: &[u32]) -> Vec<u8> {
        container(3, code, transaction_id, params)
    }

    fn event_container(code: u16, params: &[u32]) -> Vec<u8> {
        container(4, code, 0, params)
    }

    #[test]
    fn test_path_format() {
        assert_eq!(format_path(1, 4), "usb:001:004");
        assert_eq!(parse_path("usb:001:004").unwrap(), (1, 4));
        assert!(parse_path("001:004").is_err());
        assert!(parse_path("usb:1").is_err());
        assert!(parse_path("usb:300:1").is_err());
    }

    #[test]
    fn test_read_transaction_across_chunks() {
        let data = encode_data(operation::GET_DEVICE_PROP_VALUE, 5, &[0x34, 0x12]).unwrap();
        let (head, tail) = data.split_at(HEADER_LEN + 1);
        let mut pipe = ScriptedPipe::new(vec![
            head.to_vec(),
            tail.to_vec(),
            vec![],
            response_container(response::OK, 5, &[]),
        ]);

        let reply = run_transaction(
            &mut pipe,
            5,
            &Request::read(operation::GET_DEVICE_PROP_VALUE, vec![0x5005]),
            &mut Vec::new(),
        )
        .unwrap();

        assert!(reply.is_ok());
        assert_eq!(reply.data, vec![0x34, 0x12]);
        assert_eq!(pipe.written.len(), 1);
    }

    #[test]
    fn test_write_on_packet_boundary_sends_zlp() {
        let mut pipe = ScriptedPipe::new(vec![response_container(response::OK, 2, &[])]);
        pipe.max_packet_size = 16;

        // 12 byte header + 4 byte payload fills one packet exactly
        run_transaction(
            &mut pipe,
            2,
            &Request::write(operation::SET_DEVICE_PROP_VALUE, vec![0x5005], vec![1, 2, 3, 4]),
            &mut Vec::new(),
        )
        .unwrap();

        assert_eq!(pipe.written.len(), 3);
        assert!(pipe.written[2].is_empty());
    }

    #[test]
    fn test_transaction_mismatch_is_malformed() {
        let mut pipe = ScriptedPipe::new(vec![response_container(response::OK, 9, &[])]);
        let request = Request::new(operation::GET_DEVICE_INFO, vec![]);
        let result = run_transaction(&mut pipe, 1, &request, &mut Vec::new());
        assert!(matches!(result, Err(TransportError::Malformed(_))));
    }

    #[test]
    fn test_response_params() {
        let mut pipe = ScriptedPipe::new(vec![response_container(response::GENERAL_ERROR, 1, &[7])]);
        let request = Request::new(operation::GET_DEVICE_INFO, vec![]);
        let reply = run_transaction(&mut pipe, 1, &request, &mut Vec::new()).unwrap();
        assert_eq!(reply.code, response::GENERAL_ERROR);
        assert_eq!(reply.params, vec![7]);
    }

    #[test]
    fn test_bulk_event_collected_mid_transaction() {
        let mut pipe = ScriptedPipe::new(vec![
            event_container(event::OBJECT_ADDED, &[0x2A]),
            response_container(response::OK, 3, &[]),
        ]);
        let mut notices = Vec::new();

        let request = Request::new(operation::GET_DEVICE_INFO, vec![]);
        let reply = run_transaction(&mut pipe, 3, &request, &mut notices).unwrap();

        assert!(reply.is_ok());
        assert_eq!(notices, vec![DeviceNotice::new(event::OBJECT_ADDED, vec![0x2A])]);
    }

    #[test]
    fn test_interrupt_events_reported_in_order() {
        let mut pipe = ScriptedPipe::new(vec![]);
        pipe.events = VecDeque::from(vec![
            event_container(event::CAPTURE_COMPLETE, &[1]),
            vec![0xFF],
            event_container(0xC001, &[]),
        ]);

        let mut notices = vec![DeviceNotice::new(event::OBJECT_ADDED, vec![0x10])];
        poll_events(&mut pipe, &mut notices);
        let mut out = Vec::new();
        report_notices(&notices, &mut out);

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ObjectAdded. ObjectID: 10\nCaptureComplete.\nUnknown Event(C001)\n"
        );
        assert!(pipe.events.is_empty());
    }

    #[test]
    fn test_open_session_failure_releases_interface() {
        let mut pipe = ScriptedPipe::new(vec![]);
        let failed = Err(TransportError::Communication("pipe error".to_string()));
        assert!(accept_open_session(&mut pipe, "usb:001:004", failed).is_err());
        assert!(pipe.released);

        let mut pipe = ScriptedPipe::new(vec![]);
        let refused = Ok(Response {
            code: response::GENERAL_ERROR,
            params: vec![],
            data: vec![],
        });
        assert!(accept_open_session(&mut pipe, "usb:001:004", refused).is_err());
        assert!(pipe.released);
    }

    #[test]
    fn test_open_session_accepted_keeps_interface() {
        for code in [response::OK, response::SESSION_ALREADY_OPEN] {
            let mut pipe = ScriptedPipe::new(vec![]);
            let reply = Ok(Response {
                code,
                params: vec![],
                data: vec![],
            });
            assert!(accept_open_session(&mut pipe, "usb:001:004", reply).is_ok());
            assert!(!pipe.released);
        }
    }
}

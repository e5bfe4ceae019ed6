use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    sync::Arc,
};

use crossbeam_channel::Receiver;
use tracing::{debug, trace};

use crate::{
    handler::{ErrorHandler, SendError},
    telemetry::Telemetry,
    writer::PayloadWriter,
};

use super::{ForwarderConfiguration, Message};

struct Client(UdpSocket);

impl Client {
    fn from_forwarder_config(config: &ForwarderConfiguration) -> io::Result<Self> {
        let addrs = config.remote_addr.addrs();
        let local_addr = match addrs.first() {
            Some(SocketAddr::V6(_)) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
            _ => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        };

        let socket = UdpSocket::bind(local_addr)?;
        socket.connect(addrs)?;
        socket.set_write_timeout(Some(config.write_timeout))?;
        Ok(Client(socket))
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.0.send(buf)
    }
}

enum ClientState {
    // Intermediate state during send attempts.
    Inconsistent,

    // Forwarder is currently disconnected.
    Disconnected(ForwarderConfiguration),

    // Forwarder is connected and ready to send metrics.
    Ready(ForwarderConfiguration, Client),
}

impl ClientState {
    fn try_send(&mut self, payload: &[u8]) -> io::Result<usize> {
        loop {
            let old_state = std::mem::replace(self, ClientState::Inconsistent);
            match old_state {
                ClientState::Inconsistent => unreachable!("transitioned _from_ inconsistent state"),
                ClientState::Disconnected(config) => match Client::from_forwarder_config(&config) {
                    Ok(client) => *self = ClientState::Ready(config, client),
                    Err(e) => {
                        *self = ClientState::Disconnected(config);
                        return Err(e);
                    }
                },
                ClientState::Ready(config, client) => {
                    let result = client.send(payload);
                    if result.is_ok() {
                        *self = ClientState::Ready(config, client);
                    } else {
                        *self = ClientState::Disconnected(config);
                    }

                    return result;
                }
            }
        }
    }
}

/// Sends queued records to the StatsD server from a dedicated thread.
pub(crate) struct Forwarder {
    client_state: ClientState,
    max_payload_len: usize,
    rx: Receiver<Message>,
    handler: Arc<dyn ErrorHandler>,
    telemetry: Option<Telemetry>,
}

impl Forwarder {
    /// Create a new synchronous `Forwarder`.
    pub fn new(
        config: ForwarderConfiguration,
        rx: Receiver<Message>,
        handler: Arc<dyn ErrorHandler>,
        telemetry: Option<Telemetry>,
    ) -> Self {
        Forwarder {
            max_payload_len: config.max_payload_len,
            client_state: ClientState::Disconnected(config),
            rx,
            handler,
            telemetry,
        }
    }

    /// Runs the forwarder until it is shut down, or every sender has been dropped.
    ///
    /// Records are sent as soon as the queue runs empty: whatever is queued at that point is packed into as few
    /// payloads as possible, and those payloads are sent before waiting for more.
    pub fn run(mut self) {
        let mut writer = PayloadWriter::new(self.max_payload_len);

        while let Ok(message) = self.rx.recv() {
            let mut shutdown = self.write_message(&mut writer, message);

            // Pick up anything else that was queued in the meantime so it can share payloads.
            while !shutdown {
                match self.rx.try_recv() {
                    Ok(message) => shutdown = self.write_message(&mut writer, message),
                    Err(_) => break,
                }
            }

            self.send_payloads(&mut writer);

            if shutdown {
                self.reject_remaining();
                break;
            }
        }

        debug!("Forwarder stopped.");
    }

    /// Drops records that were queued behind the shutdown message, reporting each one as sent after close.
    fn reject_remaining(&self) {
        while let Ok(message) = self.rx.try_recv() {
            if matches!(message, Message::Record(_)) {
                if let Some(telemetry) = &self.telemetry {
                    telemetry.track_queue_dropped();
                }
                self.handler.handle(&SendError::Closed);
            }
        }
    }

    /// Writes a message into the payload writer, returning `true` if the forwarder should shut down.
    fn write_message(&self, writer: &mut PayloadWriter, message: Message) -> bool {
        match message {
            Message::Record(record) => {
                if !writer.write(&record) {
                    if let Some(telemetry) = &self.telemetry {
                        telemetry.track_oversize_dropped();
                    }
                    self.handler.handle(&SendError::PayloadTooLarge {
                        len: record.len(),
                        max: self.max_payload_len,
                    });
                }
                false
            }
            Message::Shutdown => true,
        }
    }

    fn send_payloads(&mut self, writer: &mut PayloadWriter) {
        if writer.is_empty() {
            return;
        }

        let mut payloads = writer.payloads();
        trace!(num_payloads = payloads.len(), "Sending payloads.");

        while let Some(payload) = payloads.next_payload() {
            match self.client_state.try_send(payload) {
                Ok(_) => {
                    if let Some(telemetry) = &self.telemetry {
                        telemetry.track_packet_send_succeeded(payload.len());
                    }
                }
                Err(e) => {
                    if let Some(telemetry) = &self.telemetry {
                        telemetry.track_packet_send_failed(payload.len());
                    }
                    self.handler.handle(&SendError::Io(e));
                }
            }
        }
    }
}

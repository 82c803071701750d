use boiler_core::{ConfigUpdate, StatusPublisher, StatusReport};
use serde::Deserialize;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use tracing::{info, warn};

/// Wire envelope for inbound messages. Lines that are not a
/// `config_update` are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Envelope {
    config_update: Option<ConfigUpdate>,
}

/// Longest inbound line the bridge will buffer. A client that streams
/// more than this without a newline is dropped so one peer cannot grow
/// memory or hog the control thread.
const MAX_LINE_BYTES: usize = 4096;

struct Client {
    stream: TcpStream,
    addr: SocketAddr,
    recv_buf: Vec<u8>,
}

/// Non-blocking TCP line server: publishes one JSON status line per cycle
/// to every connected client and drains newline-delimited configuration
/// updates from them. All failures are per-client and per-cycle; a broken
/// client is dropped and the loop carries on.
pub struct BridgeServer {
    listener: TcpListener,
    clients: Vec<Client>,
}

impl BridgeServer {
    pub fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!(addr, "bridge listening");
        Ok(Self {
            listener,
            clients: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept pending connections and drain complete lines from every
    /// client. Never blocks; returns the configuration updates received.
    pub fn poll(&mut self) -> Vec<ConfigUpdate> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(err) = stream.set_nonblocking(true) {
                        warn!(%addr, error = %err, "rejecting client");
                        continue;
                    }
                    info!(%addr, "bridge client connected");
                    self.clients.push(Client {
                        stream,
                        addr,
                        recv_buf: Vec::with_capacity(1024),
                    });
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(error = %err, "bridge accept error");
                    break;
                }
            }
        }

        let mut updates = Vec::new();
        self.clients.retain_mut(|client| {
            let mut tmp = [0u8; 1024];
            loop {
                match client.stream.read(&mut tmp) {
                    Ok(0) => {
                        info!(addr = %client.addr, "bridge client disconnected");
                        return false;
                    }
                    Ok(n) => {
                        client.recv_buf.extend_from_slice(&tmp[..n]);
                        // Bounded work per poll; the rest waits for the
                        // next cycle.
                        if client.recv_buf.len() > MAX_LINE_BYTES {
                            break;
                        }
                    }
                    Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                    Err(err) => {
                        warn!(addr = %client.addr, error = %err, "bridge read error");
                        return false;
                    }
                }
            }

            while let Some(pos) = client.recv_buf.iter().position(|b| *b == b'\n') {
                let line = client.recv_buf.drain(..=pos).collect::<Vec<u8>>();
                let text = match std::str::from_utf8(&line) {
                    Ok(text) => text.trim(),
                    Err(_) => {
                        warn!(addr = %client.addr, "discarding non-UTF-8 bridge line");
                        continue;
                    }
                };
                if text.is_empty() {
                    continue;
                }
                // A type error on any recognized key fails the whole
                // update; unknown keys are simply not deserialized.
                match serde_json::from_str::<Envelope>(text) {
                    Ok(envelope) => {
                        if let Some(update) = envelope.config_update {
                            if !update.is_empty() {
                                updates.push(update);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(addr = %client.addr, error = %err, "discarding malformed bridge message");
                    }
                }
            }

            if client.recv_buf.len() > MAX_LINE_BYTES {
                warn!(addr = %client.addr, "bridge line too long, dropping client");
                return false;
            }
            true
        });
        updates
    }
}

impl StatusPublisher for BridgeServer {
    fn publish(&mut self, report: &StatusReport) -> bool {
        let line = match serde_json::to_string(report) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "status serialization failed");
                return false;
            }
        };

        let mut delivered = false;
        self.clients.retain_mut(|client| {
            match client
                .stream
                .write_all(line.as_bytes())
                .and_then(|_| client.stream.write_all(b"\n"))
            {
                Ok(()) => {
                    delivered = true;
                    true
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    // Client is backed up; skip this cycle, try again next.
                    true
                }
                Err(err) => {
                    warn!(addr = %client.addr, error = %err, "bridge write error, dropping client");
                    false
                }
            }
        });
        delivered
    }
}

//! Debugger transport capability.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait Transport {
    /// Blocks until at least one byte is available. `Ok(0)` means the peer
    /// closed the connection.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError>;
    fn close(&mut self);
}

pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        stream.set_nodelay(true)?;
        log::info!("debugger transport connected to {addr}");
        Ok(Self {
            stream: Some(stream),
        })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        Ok(stream.read(buf)?)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        stream.write_all(buf)?;
        Ok(stream.flush()?)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

/// In-memory transport. Incoming bytes are queued up front and handed out
/// at most `max_chunk` bytes per read; everything written is recorded in a
/// buffer shared between clones.
#[derive(Clone)]
pub struct LoopbackTransport {
    incoming: Rc<RefCell<VecDeque<u8>>>,
    outgoing: Rc<RefCell<Vec<u8>>>,
    max_chunk: usize,
    closed: Rc<RefCell<bool>>,
}

impl LoopbackTransport {
    pub fn new(incoming: &[u8]) -> Self {
        Self {
            incoming: Rc::new(RefCell::new(incoming.iter().copied().collect())),
            outgoing: Rc::new(RefCell::new(Vec::new())),
            max_chunk: usize::MAX,
            closed: Rc::new(RefCell::new(false)),
        }
    }

    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    pub fn push_incoming(&self, bytes: &[u8]) {
        self.incoming.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn sent(&self) -> Vec<u8> {
        self.outgoing.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Transport for LoopbackTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut incoming = self.incoming.borrow_mut();
        let n = buf.len().min(self.max_chunk).min(incoming.len());
        for (dst, src) in buf.iter_mut().zip(incoming.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.outgoing.borrow_mut().extend_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hands_out_bounded_chunks() {
        let mut t = LoopbackTransport::new(b"abcdef").with_max_chunk(4);
        let mut buf = [0u8; 16];
        assert_eq!(t.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"abcd");
        assert_eq!(t.read(&mut buf).unwrap(), 2);
        assert_eq!(t.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn loopback_records_writes_and_closes() {
        let probe = LoopbackTransport::new(b"");
        let mut t = probe.clone();
        t.write_all(b"xy").unwrap();
        t.close();
        assert_eq!(probe.sent(), b"xy");
        assert!(probe.is_closed());
        assert!(matches!(t.write_all(b"z"), Err(TransportError::Closed)));
    }

    #[test]
    fn connect_to_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(matches!(
            TcpTransport::connect(&addr),
            Err(TransportError::Connect { .. })
        ));
    }
}

//! The debugger agent: handshake, packet assembly and the service loop.

use mote_core::{ExitCode, Transport, TransportError, VmExit};
use mote_runtime::Vm;
use smallvec::SmallVec;
use thiserror::Error;

use crate::commands;
use crate::packet::{CommandHeader, HEADER_SIZE, Packet, PacketError, Reply};
use crate::stream::OutputStream;

pub const HANDSHAKE: &[u8; 14] = b"JDWP-Handshake";

/// Upper bound on a single read while assembling a packet body.
const MAX_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("debugger sent a bad handshake")]
    Handshake,
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("debugger disconnected in the middle of a packet")]
    Disconnected,
    #[error(transparent)]
    Exit(#[from] VmExit),
}

impl AgentError {
    /// The fatal exit this failure ends the VM with.
    pub fn into_exit(self) -> VmExit {
        match self {
            AgentError::Exit(exit) => exit,
            AgentError::Handshake => VmExit::new(ExitCode::DebuggerHandshakeFailed, "bad handshake"),
            AgentError::Transport(err) => VmExit::new(ExitCode::DebuggerConnectFailed, err.to_string()),
            other => VmExit::new(ExitCode::DebuggerProtocolError, other.to_string()),
        }
    }
}

/// Fills `buf` from the transport. `Ok(false)` when the peer closed before
/// sending anything.
fn read_exact(transport: &mut dyn Transport, buf: &mut [u8]) -> Result<bool, AgentError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = transport.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(AgentError::Disconnected);
        }
        filled += n;
    }
    Ok(true)
}

pub struct Agent<T: Transport> {
    transport: T,
    reply: OutputStream,
    handled: u64,
}

impl<T: Transport> Agent<T> {
    /// Exchanges the handshake over `transport` and opens the VM's debugger
    /// session.
    pub fn attach(vm: &mut Vm, mut transport: T) -> Result<Self, AgentError> {
        let mut greeting = [0u8; HANDSHAKE.len()];
        if !read_exact(&mut transport, &mut greeting)? || &greeting != HANDSHAKE {
            transport.close();
            return Err(AgentError::Handshake);
        }
        transport.write_all(HANDSHAKE)?;
        vm.open_debug_session();
        log::info!("debugger attached");
        Ok(Self { transport, reply: OutputStream::new(), handled: 0 })
    }

    /// Reads the next command packet. The body is kept in the chunks the
    /// transport delivered it in. `Ok(None)` on a clean disconnect.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, AgentError> {
        let mut head = [0u8; HEADER_SIZE];
        if !read_exact(&mut self.transport, &mut head)? {
            return Ok(None);
        }
        let header = CommandHeader::parse(&head)?;

        let mut chunks: SmallVec<[Vec<u8>; 4]> = SmallVec::new();
        let mut left = header.body_len();
        while left > 0 {
            let mut chunk = vec![0u8; left.min(MAX_CHUNK)];
            let n = self.transport.read(&mut chunk)?;
            if n == 0 {
                return Err(AgentError::Disconnected);
            }
            chunk.truncate(n);
            left -= n;
            chunks.push(chunk);
        }
        Ok(Some(Packet::new(header, chunks)?))
    }

    /// Dispatches one packet and sends its reply.
    pub fn handle(&mut self, vm: &mut Vm, packet: &Packet) -> Result<(), AgentError> {
        let header = packet.header;
        log::trace!(
            "packet {}: command {}/{}, {} data bytes in {} segments",
            header.id,
            header.command_set,
            header.command,
            header.body_len(),
            packet.segments()
        );
        let mut input = packet.input();
        self.reply.clear();
        commands::dispatch(vm, header.command_set, header.command, &mut input, &mut self.reply)?;
        if !self.reply.is_ok() {
            log::debug!("packet {} failed: {:?}", header.id, self.reply.error());
        }
        self.transport.write_all(&Reply::encode(header.id, &self.reply))?;
        self.handled += 1;
        Ok(())
    }

    /// Services at most one packet. Returns false once the debugger is gone.
    pub fn service_one(&mut self, vm: &mut Vm) -> Result<bool, AgentError> {
        match self.read_packet()? {
            Some(packet) => {
                self.handle(vm, &packet)?;
                Ok(vm.debug_session().is_some())
            }
            None => {
                log::info!("debugger disconnected after {} packets", self.handled);
                vm.close_debug_session();
                Ok(false)
            }
        }
    }

    /// Services packets until the debugger disposes the session or
    /// disconnects, then closes the transport.
    pub fn service(&mut self, vm: &mut Vm) -> Result<(), AgentError> {
        while self.service_one(vm)? {}
        self.transport.close();
        Ok(())
    }

    pub fn packets_handled(&self) -> u64 {
        self.handled
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

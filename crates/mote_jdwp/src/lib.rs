//! Debugger wire protocol for the Mote VM.
//!
//! - `constants` - error codes, value tags and command set numbers
//! - `stream` - big-endian input/output streams over packet bytes
//! - `packet` - command and reply framing
//! - `commands` - per-command-set handlers and dispatch
//! - `agent` - handshake and the packet service loop

pub mod agent;
pub mod commands;
pub mod constants;
pub mod packet;
pub mod stream;

pub use agent::{Agent, AgentError, HANDSHAKE};
pub use commands::{CommandFn, dispatch, handler_for};
pub use constants::{ErrorCode, command_set, tag};
pub use packet::{CommandHeader, HEADER_SIZE, Packet, PacketError, Reply};
pub use stream::{InputStream, Location, OutputStream};

mod common;

use common::vm;
use mote_core::{ExitCode, LoopbackTransport};
use mote_jdwp::command_set as cs;
use mote_jdwp::packet::{FLAG_REPLY, encode_command};
use mote_jdwp::{Agent, AgentError, HANDSHAKE, Reply};

fn replies(mut bytes: &[u8]) -> Vec<Reply> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        let reply = Reply::parse(bytes).unwrap();
        let len = 11 + reply.data.len();
        bytes = &bytes[len..];
        out.push(reply);
    }
    out
}

#[test]
fn services_packets_until_dispose() {
    let mut incoming = HANDSHAKE.to_vec();
    incoming.extend(encode_command(1, cs::THREAD_GROUP_REFERENCE, cs::thread_group::NAME, &1u32.to_be_bytes()));
    incoming.extend(encode_command(2, cs::VIRTUAL_MACHINE, cs::vm::DISPOSE, &[]));
    // Never processed: the session is gone after Dispose.
    incoming.extend(encode_command(3, cs::VIRTUAL_MACHINE, cs::vm::ID_SIZES, &[]));
    let transport = LoopbackTransport::new(&incoming).with_max_chunk(3);

    let mut vm = vm();
    let mut agent = Agent::attach(&mut vm, transport.clone()).unwrap();
    assert!(vm.debug_session().is_some());
    agent.service(&mut vm).unwrap();

    assert_eq!(agent.packets_handled(), 2);
    assert!(vm.debug_session().is_none());
    assert!(transport.is_closed());

    let sent = transport.sent();
    assert_eq!(&sent[..HANDSHAKE.len()], HANDSHAKE);
    let replies = replies(&sent[HANDSHAKE.len()..]);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].id, 1);
    assert_eq!(replies[0].data, b"\x00\x00\x00\x06system");
    assert_eq!((replies[1].id, replies[1].error), (2, 0));
}

#[test]
fn packet_bodies_arrive_in_chunks() {
    let mut incoming = HANDSHAKE.to_vec();
    incoming.extend(encode_command(9, cs::THREAD_GROUP_REFERENCE, cs::thread_group::CHILDREN, &1u32.to_be_bytes()));
    let transport = LoopbackTransport::new(&incoming).with_max_chunk(1);

    let mut vm = vm();
    let mut agent = Agent::attach(&mut vm, transport.clone()).unwrap();
    let packet = agent.read_packet().unwrap().unwrap();
    assert_eq!(packet.segments(), 4);
    agent.handle(&mut vm, &packet).unwrap();

    let sent = transport.sent();
    let reply = Reply::parse(&sent[HANDSHAKE.len()..]).unwrap();
    assert_eq!(reply.data, vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2]);
}

#[test]
fn clean_disconnect_closes_the_session() {
    let transport = LoopbackTransport::new(HANDSHAKE);
    let mut vm = vm();
    let mut agent = Agent::attach(&mut vm, transport).unwrap();
    agent.service(&mut vm).unwrap();
    assert_eq!(agent.packets_handled(), 0);
    assert!(vm.debug_session().is_none());
}

#[test]
fn bad_handshake_is_refused() {
    let transport = LoopbackTransport::new(b"JDWP-Handshak!");
    let mut vm = vm();
    let err = Agent::attach(&mut vm, transport.clone()).err().unwrap();
    assert!(matches!(err, AgentError::Handshake));
    assert_eq!(err.into_exit().kind(), Some(ExitCode::DebuggerHandshakeFailed));
    assert!(vm.debug_session().is_none());
    assert!(transport.sent().is_empty());
    assert!(transport.is_closed());
}

#[test]
fn disconnect_mid_packet_is_a_protocol_error() {
    let mut incoming = HANDSHAKE.to_vec();
    let packet = encode_command(1, cs::THREAD_GROUP_REFERENCE, cs::thread_group::NAME, &1u32.to_be_bytes());
    incoming.extend_from_slice(&packet[..13]);
    let mut vm = vm();
    let mut agent = Agent::attach(&mut vm, LoopbackTransport::new(&incoming)).unwrap();
    let err = agent.service(&mut vm).unwrap_err();
    assert!(matches!(err, AgentError::Disconnected));
    assert_eq!(err.into_exit().kind(), Some(ExitCode::DebuggerProtocolError));
}

#[test]
fn reply_packets_from_the_debugger_are_rejected() {
    let mut incoming = HANDSHAKE.to_vec();
    let mut packet = encode_command(4, cs::VIRTUAL_MACHINE, cs::vm::ID_SIZES, &[]);
    packet[8] = FLAG_REPLY;
    incoming.extend(packet);
    let mut vm = vm();
    let mut agent = Agent::attach(&mut vm, LoopbackTransport::new(&incoming)).unwrap();
    let err = agent.service(&mut vm).unwrap_err();
    assert!(matches!(err, AgentError::Packet(_)));
}

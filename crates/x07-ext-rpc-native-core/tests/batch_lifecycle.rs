use std::io::Read;

use x07_ext_rpc_native_core::assembler::{self, InitialMetadata, ServerStatus};
use x07_ext_rpc_native_core::op::{INITIAL_METADATA_WAIT_FOR_READY, WRITE_BUFFER_HINT};
use x07_ext_rpc_native_core::{
    BatchContext, CallError, MetadataArray, OpKind, RpcPolicy, StatusCode, Tag,
};


use loopback::{Loopback, Reply};

fn metadata(pairs: &[(&str, &str)]) -> MetadataArray {
    let mut array = MetadataArray::new();
    for (k, v) in pairs {
        array.add(k.as_bytes(), v.as_bytes());
    }
    array
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    pairs
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

#[test]
fn unary_round_trip() {
    let call = Loopback::new(Reply {
        initial_metadata: vec![("content-type", "application/grpc")],
        message: Some(vec!["pong", "-", "pong"]),
        status: StatusCode::OK,
        details: "done",
        trailing_metadata: vec![("grpc-status", "0")],
        cancelled: false,
    });
    let mut ctx = BatchContext::new();
    let mut md = metadata(&[
        ("authorization", "bearer t"),
        ("x-trace", "1"),
        ("x-trace", "2"),
    ]);

    unsafe {
        assembler::start_unary(
            &call,
            &mut ctx,
            b"ping",
            WRITE_BUFFER_HINT,
            Some(&mut md),
            INITIAL_METADATA_WAIT_FOR_READY,
            Tag::new(11),
        )
    }
    .expect("accepted");

    assert!(md.is_empty());
    assert_eq!(md.capacity(), 0);

    let seen = call.last();
    assert_eq!(seen.tag, Tag::new(11));
    assert_eq!(seen.kinds, vec![
        OpKind::SendInitialMetadata,
        OpKind::SendMessage,
        OpKind::SendCloseFromClient,
        OpKind::RecvInitialMetadata,
        OpKind::RecvMessage,
        OpKind::RecvStatusOnClient,
    ]);
    assert_eq!(seen.initial_metadata[0].len(), 3);
    assert_eq!(
        seen.initial_metadata[0],
        owned(&[("authorization", "bearer t"), ("x-trace", "1"), ("x-trace", "2")])
    );
    assert_eq!(seen.messages, vec![b"ping".to_vec()]);

    assert_eq!(ctx.recv_initial_metadata().value(0), b"application/grpc");
    assert_eq!(ctx.recv_message_len(), Some(9));
    let mut out = vec![0u8; 9];
    assert_eq!(ctx.copy_recv_message_to(&mut out), 9);
    assert_eq!(&out, b"pong-pong");
    assert_eq!(ctx.recv_status(), StatusCode::OK);
    assert_eq!(ctx.recv_status_details(), b"done");
    assert_eq!(ctx.recv_status_trailing_metadata().key(0), b"grpc-status");
}

#[test]
fn caller_buffer_can_be_reused_after_submission() {
    let call = Loopback::new(Reply::default());
    let mut ctx = BatchContext::new();
    let mut payload = b"first".to_vec();
    unsafe { assembler::send_message(&call, &mut ctx, &payload, 0, false, Tag::new(1)) }
        .expect("accepted");
    payload.copy_from_slice(b"xxxxx");
    assert_eq!(call.last().messages, vec![b"first".to_vec()]);
}

#[test]
fn inbound_message_take_and_reader() {
    let call = Loopback::new(Reply {
        message: Some(vec!["abc", "", "def"]),
        ..Reply::default()
    });

    let mut ctx = BatchContext::new();
    unsafe { assembler::recv_message(&call, &mut ctx, Tag::new(3)) }.expect("accepted");
    let taken = ctx.take_recv_message().expect("message");
    assert_eq!(taken.to_vec(), b"abcdef");
    assert_eq!(ctx.recv_message_len(), None);
    assert!(ctx.take_recv_message().is_none());

    let mut ctx = BatchContext::new();
    unsafe { assembler::recv_message(&call, &mut ctx, Tag::new(4)) }.expect("accepted");
    let mut reader = ctx.take_recv_message_reader().expect("reader");
    let mut text = String::new();
    reader.read_to_string(&mut text).expect("read");
    assert_eq!(text, "abcdef");
}

#[test]
fn end_of_stream_reads_absent() {
    let call = Loopback::new(Reply::default());
    let mut ctx = BatchContext::new();
    unsafe { assembler::recv_message(&call, &mut ctx, Tag::new(5)) }.expect("accepted");
    assert_eq!(ctx.recv_message_len(), None);
    assert!(ctx.take_recv_message().is_none());
}

#[test]
#[should_panic(expected = "destination buffer too small")]
fn copy_into_short_buffer_is_fatal() {
    let call = Loopback::new(Reply {
        message: Some(vec!["0123", "4567"]),
        ..Reply::default()
    });
    let mut ctx = BatchContext::new();
    unsafe { assembler::recv_message(&call, &mut ctx, Tag::new(6)) }.expect("accepted");
    let mut out = vec![0u8; 7];
    ctx.copy_recv_message_to(&mut out);
}

#[test]
fn send_status_with_message_and_caller_metadata() {
    let call = Loopback::new(Reply::default());
    let mut ctx = BatchContext::new();
    let mut trailing = metadata(&[("grpc-retry-pushback-ms", "10")]);
    let mut initial = metadata(&[("server", "x07")]);

    unsafe {
        assembler::send_status_from_server(
            &call,
            &mut ctx,
            ServerStatus::new(StatusCode::NOT_FOUND, b"no such key")
                .with_trailing_metadata(&mut trailing),
            InitialMetadata::Caller(&mut initial),
            Some(&b"body"[..]),
            0,
            Tag::new(21),
        )
    }
    .expect("accepted");

    assert!(trailing.is_empty());
    assert!(initial.is_empty());

    let seen = call.last();
    assert_eq!(seen.kinds, vec![
        OpKind::SendStatusFromServer,
        OpKind::SendMessage,
        OpKind::SendInitialMetadata,
    ]);
    assert_eq!(
        seen.status,
        Some((StatusCode::NOT_FOUND, b"no such key".to_vec()))
    );
    assert_eq!(seen.trailing_metadata, owned(&[("grpc-retry-pushback-ms", "10")]));
    assert_eq!(seen.messages, vec![b"body".to_vec()]);
    assert_eq!(seen.initial_metadata, vec![owned(&[("server", "x07")])]);
}

#[test]
fn send_status_alone() {
    let call = Loopback::new(Reply::default());
    let mut ctx = BatchContext::new();
    unsafe {
        assembler::send_status_from_server(
            &call,
            &mut ctx,
            ServerStatus::new(StatusCode::OK, b""),
            InitialMetadata::AlreadySent,
            None,
            0,
            Tag::new(22),
        )
    }
    .expect("accepted");
    let seen = call.last();
    assert_eq!(seen.kinds, vec![OpKind::SendStatusFromServer]);
    assert!(seen.trailing_metadata.is_empty());
}

#[test]
fn server_side_completion_sets_cancelled() {
    let call = Loopback::new(Reply {
        cancelled: true,
        ..Reply::default()
    });
    let mut ctx = BatchContext::new();
    unsafe { assembler::start_serverside(&call, &mut ctx, Tag::new(30)) }.expect("accepted");
    assert!(ctx.recv_close_on_server_cancelled());
}

#[test]
fn kick_is_an_empty_batch() {
    let call = Loopback::new(Reply::default());
    assembler::kick_completion_queue(&call, Tag::new(0xfeed)).expect("accepted");
    let seen = call.last();
    assert!(seen.kinds.is_empty());
    assert_eq!(seen.tag, Tag::new(0xfeed));
}

#[test]
fn engine_rejection_is_returned_unchanged() {
    for err in [
        CallError::NotOnClient,
        CallError::AlreadyFinished,
        CallError::TooManyOperations,
    ] {
        let call = Loopback::rejecting(err);
        let mut ctx = BatchContext::new();
        let res =
            unsafe { assembler::start_duplex_streaming(&call, &mut ctx, None, 0, Tag::new(1)) };
        assert_eq!(res, Err(err));
        assert!(call.batches().is_empty());
    }
    let call = Loopback::rejecting(CallError::AlreadyFinished);
    assert_eq!(
        assembler::send_close_from_client(&call, Tag::new(2)),
        Err(CallError::AlreadyFinished)
    );
}

#[test]
fn oversized_message_leaves_caller_metadata() {
    let call = Loopback::new(Reply::default());
    let mut ctx = BatchContext::with_policy(RpcPolicy {
        max_message_bytes: 8,
        ..RpcPolicy::default()
    });
    let mut md = metadata(&[("k", "v")]);
    let res = unsafe {
        assembler::start_server_streaming(
            &call,
            &mut ctx,
            b"nine bytes",
            0,
            Some(&mut md),
            0,
            Tag::new(1),
        )
    };
    assert_eq!(res, Err(CallError::InvalidMessage));
    assert_eq!(md.len(), 1);
    assert_eq!(md.key(0), b"k");
    assert!(call.batches().is_empty());
}

#[test]
fn chunked_send_reaches_engine_intact() {
    let call = Loopback::new(Reply::default());
    let mut ctx = BatchContext::with_policy(RpcPolicy {
        send_chunk_bytes: 3,
        ..RpcPolicy::default()
    });
    unsafe { assembler::send_message(&call, &mut ctx, b"0123456789", 0, true, Tag::new(1)) }
        .expect("accepted");
    let seen = call.last();
    assert_eq!(seen.kinds, vec![OpKind::SendMessage, OpKind::SendInitialMetadata]);
    assert_eq!(seen.messages, vec![b"0123456789".to_vec()]);
    assert!(seen.initial_metadata[0].is_empty());
}

#[test]
fn contexts_are_independent_across_batches() {
    let call = Loopback::new(Reply {
        initial_metadata: vec![("a", "1")],
        ..Reply::default()
    });
    let mut first = BatchContext::new();
    let mut second = BatchContext::new();
    unsafe {
        assembler::start_client_streaming(&call, &mut first, None, 0, Tag::new(1))
            .expect("accepted");
        assembler::recv_initial_metadata(&call, &mut second, Tag::new(2)).expect("accepted");
    }
    drop(first);
    assert_eq!(second.recv_initial_metadata().len(), 1);
    assert_eq!(call.batches().len(), 2);
}

#[test]
fn status_codes_outside_the_canonical_set_round_trip() {
    let call = Loopback::new(Reply {
        status: StatusCode::new(99),
        details: "custom",
        ..Reply::default()
    });

    let mut ctx = BatchContext::new();
    unsafe {
        assembler::send_status_from_server(
            &call,
            &mut ctx,
            ServerStatus::new(StatusCode::new(42), b"app specific"),
            InitialMetadata::AlreadySent,
            None,
            0,
            Tag::new(1),
        )
    }
    .expect("accepted");
    assert_eq!(
        call.last().status,
        Some((StatusCode::new(42), b"app specific".to_vec()))
    );

    let mut ctx = BatchContext::new();
    unsafe { assembler::start_duplex_streaming(&call, &mut ctx, None, 0, Tag::new(2)) }
        .expect("accepted");
    assert_eq!(ctx.recv_status().code(), 99);
    assert_eq!(ctx.recv_status().name(), None);
    assert_eq!(ctx.recv_status_details(), b"custom");
}

#[test]
fn disabled_policy_refuses_before_moving_metadata() {
    let call = Loopback::new(Reply::default());
    let mut ctx = BatchContext::with_policy(RpcPolicy {
        enabled: false,
        ..RpcPolicy::default()
    });
    let mut md = metadata(&[("k", "v")]);
    let res = unsafe {
        assembler::start_client_streaming(&call, &mut ctx, Some(&mut md), 0, Tag::new(1))
    };
    assert_eq!(res, Err(CallError::Error));
    assert_eq!(md.len(), 1);
    assert!(call.batches().is_empty());
    assert!(!ctx.policy().enabled);
}

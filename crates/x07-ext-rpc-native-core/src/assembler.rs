//! One submission builder per RPC shape.
//!
//! Every builder installs its inputs in the [`BatchContext`], builds the ops
//! for its shape in wire order and hands them to [`Call::start_batch`] as one
//! batch. The engine's acceptance result is returned unchanged.
//!
//! A context whose policy has `enabled` off refuses with
//! [`CallError::Error`] before touching any input. The builders that take no
//! context (`send_close_from_client`, `kick_completion_queue`) are not gated
//! here.
//!
//! # Safety
//!
//! Builders that take a context return before the batch completes, and the
//! engine keeps pointers into the context until it does. The caller must keep
//! the context in place, and must neither read nor drop it, until the
//! completion for `tag` has been delivered. A rejected submission produces no
//! completion, so the context may be reused or dropped right away.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::batch::{BatchContext, Staging};
use crate::engine::{Call, Tag};
use crate::metadata::MetadataArray;
use crate::op::{MetadataView, Op};
use crate::status::{CallError, StatusCode};

/// The status a server sends to finish a call.
#[derive(Debug)]
pub struct ServerStatus<'a> {
    pub code: StatusCode,
    pub details: &'a [u8],
    pub trailing_metadata: Option<&'a mut MetadataArray>,
}

impl<'a> ServerStatus<'a> {
    pub fn new(code: StatusCode, details: &'a [u8]) -> Self {
        ServerStatus {
            code,
            details,
            trailing_metadata: None,
        }
    }

    pub fn with_trailing_metadata(mut self, metadata: &'a mut MetadataArray) -> Self {
        self.trailing_metadata = Some(metadata);
        self
    }
}

/// Initial metadata to send along with a server status.
#[derive(Debug, Default)]
pub enum InitialMetadata<'a> {
    #[default]
    AlreadySent,
    Empty,
    Caller(&'a mut MetadataArray),
}

fn recv_status_op(staging: &mut Staging<'_>) -> Op {
    let (trailing_metadata, status, details) = staging.recv_status();
    Op::RecvStatusOnClient {
        trailing_metadata,
        status,
        details,
    }
}

/// Opens the context for staging, refusing when the policy disables
/// submissions.
fn staged(ctx: &mut BatchContext) -> Result<Staging<'_>, CallError> {
    let staging = ctx.stage();
    staging.check_enabled()?;
    Ok(staging)
}

unsafe fn submit(
    call: &dyn Call,
    shape: &'static str,
    ops: &[Op],
    tag: Tag,
) -> Result<(), CallError> {
    trace!(shape, ops = ops.len(), tag = tag.raw(), "starting batch");
    call.start_batch(ops, tag).inspect_err(|err| {
        debug!(shape, tag = tag.raw(), error = %err, "engine rejected batch");
    })
}

/// # Safety
///
/// See the [module docs](self).
pub unsafe fn start_unary(
    call: &dyn Call,
    ctx: &mut BatchContext,
    message: &[u8],
    write_flags: u32,
    initial_metadata: Option<&mut MetadataArray>,
    initial_metadata_flags: u32,
    tag: Tag,
) -> Result<(), CallError> {
    let mut staging = staged(ctx)?;
    staging.check_message(message)?;
    let ops = [
        Op::SendInitialMetadata {
            metadata: staging.send_initial_metadata(initial_metadata),
            flags: initial_metadata_flags,
        },
        Op::SendMessage {
            message: staging.send_message(message),
            flags: write_flags,
        },
        Op::SendCloseFromClient,
        Op::RecvInitialMetadata {
            metadata: staging.recv_initial_metadata(),
        },
        Op::RecvMessage {
            message: staging.recv_message(),
        },
        recv_status_op(&mut staging),
    ];
    submit(call, "unary", &ops, tag)
}

/// # Safety
///
/// See the [module docs](self).
pub unsafe fn start_client_streaming(
    call: &dyn Call,
    ctx: &mut BatchContext,
    initial_metadata: Option<&mut MetadataArray>,
    initial_metadata_flags: u32,
    tag: Tag,
) -> Result<(), CallError> {
    let mut staging = staged(ctx)?;
    let ops = [
        Op::SendInitialMetadata {
            metadata: staging.send_initial_metadata(initial_metadata),
            flags: initial_metadata_flags,
        },
        Op::RecvInitialMetadata {
            metadata: staging.recv_initial_metadata(),
        },
        Op::RecvMessage {
            message: staging.recv_message(),
        },
        recv_status_op(&mut staging),
    ];
    submit(call, "client_streaming", &ops, tag)
}

/// # Safety
///
/// See the [module docs](self).
pub unsafe fn start_server_streaming(
    call: &dyn Call,
    ctx: &mut BatchContext,
    message: &[u8],
    write_flags: u32,
    initial_metadata: Option<&mut MetadataArray>,
    initial_metadata_flags: u32,
    tag: Tag,
) -> Result<(), CallError> {
    let mut staging = staged(ctx)?;
    staging.check_message(message)?;
    let ops = [
        Op::SendInitialMetadata {
            metadata: staging.send_initial_metadata(initial_metadata),
            flags: initial_metadata_flags,
        },
        Op::SendMessage {
            message: staging.send_message(message),
            flags: write_flags,
        },
        Op::SendCloseFromClient,
        recv_status_op(&mut staging),
    ];
    submit(call, "server_streaming", &ops, tag)
}

/// # Safety
///
/// See the [module docs](self).
pub unsafe fn start_duplex_streaming(
    call: &dyn Call,
    ctx: &mut BatchContext,
    initial_metadata: Option<&mut MetadataArray>,
    initial_metadata_flags: u32,
    tag: Tag,
) -> Result<(), CallError> {
    let mut staging = staged(ctx)?;
    let ops = [
        Op::SendInitialMetadata {
            metadata: staging.send_initial_metadata(initial_metadata),
            flags: initial_metadata_flags,
        },
        recv_status_op(&mut staging),
    ];
    submit(call, "duplex_streaming", &ops, tag)
}

/// # Safety
///
/// See the [module docs](self).
pub unsafe fn recv_initial_metadata(
    call: &dyn Call,
    ctx: &mut BatchContext,
    tag: Tag,
) -> Result<(), CallError> {
    let ops = [Op::RecvInitialMetadata {
        metadata: staged(ctx)?.recv_initial_metadata(),
    }];
    submit(call, "recv_initial_metadata", &ops, tag)
}

/// Sends one message. With `send_empty_initial_metadata` the batch also
/// sends an empty initial-metadata op after it.
///
/// # Safety
///
/// See the [module docs](self).
pub unsafe fn send_message(
    call: &dyn Call,
    ctx: &mut BatchContext,
    message: &[u8],
    write_flags: u32,
    send_empty_initial_metadata: bool,
    tag: Tag,
) -> Result<(), CallError> {
    let mut staging = staged(ctx)?;
    staging.check_message(message)?;
    let mut ops = Vec::with_capacity(2);
    ops.push(Op::SendMessage {
        message: staging.send_message(message),
        flags: write_flags,
    });
    if send_empty_initial_metadata {
        ops.push(Op::SendInitialMetadata {
            metadata: MetadataView::empty(),
            flags: 0,
        });
    }
    submit(call, "send_message", &ops, tag)
}

pub fn send_close_from_client(call: &dyn Call, tag: Tag) -> Result<(), CallError> {
    unsafe { submit(call, "send_close_from_client", &[Op::SendCloseFromClient], tag) }
}

/// Sends the final status, then the optional message, then initial metadata
/// unless it already went out.
///
/// # Safety
///
/// See the [module docs](self).
pub unsafe fn send_status_from_server(
    call: &dyn Call,
    ctx: &mut BatchContext,
    status: ServerStatus<'_>,
    initial_metadata: InitialMetadata<'_>,
    message: Option<&[u8]>,
    write_flags: u32,
    tag: Tag,
) -> Result<(), CallError> {
    let mut staging = staged(ctx)?;
    if let Some(message) = message {
        staging.check_message(message)?;
    }
    let mut ops = Vec::with_capacity(3);
    ops.push(Op::SendStatusFromServer {
        status: status.code,
        details: Bytes::copy_from_slice(status.details),
        trailing_metadata: staging.send_status_trailing_metadata(status.trailing_metadata),
    });
    if let Some(message) = message {
        ops.push(Op::SendMessage {
            message: staging.send_message(message),
            flags: write_flags,
        });
    }
    let metadata = match initial_metadata {
        InitialMetadata::AlreadySent => None,
        InitialMetadata::Empty => Some(MetadataView::empty()),
        InitialMetadata::Caller(src) => Some(staging.send_initial_metadata(Some(src))),
    };
    if let Some(metadata) = metadata {
        ops.push(Op::SendInitialMetadata { metadata, flags: 0 });
    }
    submit(call, "send_status_from_server", &ops, tag)
}

/// # Safety
///
/// See the [module docs](self).
pub unsafe fn recv_message(
    call: &dyn Call,
    ctx: &mut BatchContext,
    tag: Tag,
) -> Result<(), CallError> {
    let ops = [Op::RecvMessage {
        message: staged(ctx)?.recv_message(),
    }];
    submit(call, "recv_message", &ops, tag)
}

/// Waits for the client to close its side; fills the cancellation flag.
///
/// # Safety
///
/// See the [module docs](self).
pub unsafe fn start_serverside(
    call: &dyn Call,
    ctx: &mut BatchContext,
    tag: Tag,
) -> Result<(), CallError> {
    let ops = [Op::RecvCloseOnServer {
        cancelled: staged(ctx)?.recv_close_on_server(),
    }];
    submit(call, "serverside", &ops, tag)
}

/// # Safety
///
/// See the [module docs](self).
pub unsafe fn send_initial_metadata(
    call: &dyn Call,
    ctx: &mut BatchContext,
    initial_metadata: Option<&mut MetadataArray>,
    tag: Tag,
) -> Result<(), CallError> {
    let ops = [Op::SendInitialMetadata {
        metadata: staged(ctx)?.send_initial_metadata(initial_metadata),
        flags: 0,
    }];
    submit(call, "send_initial_metadata", &ops, tag)
}

/// Wakes the call's completion queue with `tag`. Mutates no call state, so
/// it may race with any other submission on the same call.
pub fn kick_completion_queue(call: &dyn Call, tag: Tag) -> Result<(), CallError> {
    unsafe { submit(call, "kick", &[], tag) }
}

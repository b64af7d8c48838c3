//! Typed operation descriptors.
//!
//! Each variant carries only the data its operation needs. Send-side
//! variants point at buffers owned by a [`crate::BatchContext`]; receive-side
//! variants point at the context fields the engine fills in before it reports
//! completion. None of these pointers keep the context alive: whoever submits
//! a batch must keep its context in place until the completion for the
//! batch's tag has been delivered.

use std::fmt;
use std::ptr::NonNull;

use bytes::Bytes;

use crate::byte_buffer::ByteBuffer;
use crate::metadata::{Metadata, MetadataArray};
use crate::status::StatusCode;

pub const WRITE_BUFFER_HINT: u32 = 0x1;
pub const WRITE_NO_COMPRESS: u32 = 0x2;
pub const WRITE_THROUGH: u32 = 0x4;

pub const INITIAL_METADATA_IDEMPOTENT_REQUEST: u32 = 0x10;
pub const INITIAL_METADATA_WAIT_FOR_READY: u32 = 0x20;
pub const INITIAL_METADATA_CACHEABLE_REQUEST: u32 = 0x40;
pub const INITIAL_METADATA_WAIT_FOR_READY_EXPLICITLY_SET: u32 = 0x80;
pub const INITIAL_METADATA_CORKED: u32 = 0x100;

/// Entries of a metadata array owned by a batch context.
#[derive(Clone, Copy, Debug)]
pub struct MetadataView {
    ptr: NonNull<Metadata>,
    len: usize,
}

impl MetadataView {
    pub fn empty() -> Self {
        MetadataView {
            ptr: NonNull::dangling(),
            len: 0,
        }
    }

    pub(crate) fn of(array: &MetadataArray) -> Self {
        let entries = array.as_slice();
        MetadataView {
            ptr: NonNull::from(entries).cast(),
            len: entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const Metadata {
        self.ptr.as_ptr()
    }

    /// # Safety
    ///
    /// The owning context must be alive and must not have been mutated since
    /// the view was taken.
    pub unsafe fn as_slice<'a>(&self) -> &'a [Metadata] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }
}

/// An outbound payload owned by a batch context.
#[derive(Clone, Copy, Debug)]
pub struct MessageView(NonNull<ByteBuffer>);

impl MessageView {
    pub(crate) fn of(message: &ByteBuffer) -> Self {
        MessageView(NonNull::from(message))
    }

    pub fn as_ptr(&self) -> *const ByteBuffer {
        self.0.as_ptr()
    }

    /// # Safety
    ///
    /// Same contract as [`MetadataView::as_slice`].
    pub unsafe fn get<'a>(&self) -> &'a ByteBuffer {
        &*self.0.as_ptr()
    }
}

/// A context field the engine writes into when the batch completes.
pub struct Slot<T>(NonNull<T>);

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.0).finish()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) fn new(target: &mut T) -> Self {
        Slot(NonNull::from(target))
    }

    pub fn as_ptr(&self) -> *mut T {
        self.0.as_ptr()
    }

    /// Replaces the target, dropping its previous value.
    ///
    /// # Safety
    ///
    /// The owning context must be alive, must not have moved since the slot
    /// was taken, and nothing else may be accessing the field.
    pub unsafe fn write(&self, value: T) {
        *self.0.as_ptr() = value;
    }

    /// # Safety
    ///
    /// Same contract as [`Slot::write`].
    pub unsafe fn get_mut<'a>(&self) -> &'a mut T {
        &mut *self.0.as_ptr()
    }
}

#[derive(Clone, Debug)]
pub enum Op {
    SendInitialMetadata {
        metadata: MetadataView,
        flags: u32,
    },
    SendMessage {
        message: MessageView,
        flags: u32,
    },
    SendCloseFromClient,
    SendStatusFromServer {
        status: StatusCode,
        details: Bytes,
        trailing_metadata: MetadataView,
    },
    RecvInitialMetadata {
        metadata: Slot<MetadataArray>,
    },
    RecvMessage {
        message: Slot<Option<ByteBuffer>>,
    },
    RecvStatusOnClient {
        trailing_metadata: Slot<MetadataArray>,
        status: Slot<StatusCode>,
        details: Slot<Bytes>,
    },
    RecvCloseOnServer {
        cancelled: Slot<bool>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    SendInitialMetadata,
    SendMessage,
    SendCloseFromClient,
    SendStatusFromServer,
    RecvInitialMetadata,
    RecvMessage,
    RecvStatusOnClient,
    RecvCloseOnServer,
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::SendInitialMetadata { .. } => OpKind::SendInitialMetadata,
            Op::SendMessage { .. } => OpKind::SendMessage,
            Op::SendCloseFromClient => OpKind::SendCloseFromClient,
            Op::SendStatusFromServer { .. } => OpKind::SendStatusFromServer,
            Op::RecvInitialMetadata { .. } => OpKind::RecvInitialMetadata,
            Op::RecvMessage { .. } => OpKind::RecvMessage,
            Op::RecvStatusOnClient { .. } => OpKind::RecvStatusOnClient,
            Op::RecvCloseOnServer { .. } => OpKind::RecvCloseOnServer,
        }
    }

    pub fn flags(&self) -> u32 {
        match self {
            Op::SendInitialMetadata { flags, .. } | Op::SendMessage { flags, .. } => *flags,
            _ => 0,
        }
    }
}

pub fn op_kinds(ops: &[Op]) -> Vec<OpKind> {
    ops.iter().map(Op::kind).collect()
}

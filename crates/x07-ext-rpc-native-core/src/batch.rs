//! Per-submission buffer ownership.
//!
//! A [`BatchContext`] owns every buffer handed to or produced by one batch.
//! Outbound metadata is moved in, outbound payloads are copied in, and the
//! engine writes inbound results into the context's fields through the slots
//! carried by the receive ops. Dropping the context releases all of it once,
//! each field in its own discipline.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::byte_buffer::{ByteBuffer, MessageReader};
use crate::metadata::MetadataArray;
use crate::op::{MessageView, MetadataView, Slot};
use crate::policy::RpcPolicy;
use crate::status::{CallError, StatusCode};

#[derive(Debug, Default)]
struct RecvStatus {
    trailing_metadata: MetadataArray,
    status: StatusCode,
    details: Bytes,
}

#[derive(Default)]
pub struct BatchContext {
    send_initial_metadata: MetadataArray,
    send_message: Option<ByteBuffer>,
    send_status_trailing_metadata: MetadataArray,
    recv_initial_metadata: MetadataArray,
    recv_message: Option<ByteBuffer>,
    recv_status: RecvStatus,
    recv_close_on_server_cancelled: bool,
    policy: RpcPolicy,
}

impl fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchContext")
            .field("send_initial_metadata", &self.send_initial_metadata.len())
            .field("send_message", &self.send_message.as_ref().map(ByteBuffer::len))
            .field("recv_message", &self.recv_message_len())
            .field("status", &self.recv_status.status)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RpcPolicy) -> Self {
        let mut ctx = Self::default();
        ctx.policy = policy;
        ctx
    }

    pub fn policy(&self) -> RpcPolicy {
        self.policy
    }

    pub fn recv_initial_metadata(&self) -> &MetadataArray {
        &self.recv_initial_metadata
    }

    /// Total inbound payload length, or `None` when there is no payload (none
    /// arrived, or it was taken).
    pub fn recv_message_len(&self) -> Option<usize> {
        self.recv_message.as_ref().map(ByteBuffer::len)
    }

    pub fn recv_message(&self) -> Option<&ByteBuffer> {
        self.recv_message.as_ref()
    }

    /// Copies the inbound payload into `dst` and returns its length.
    ///
    /// Panics if there is no inbound payload or `dst` is shorter than it.
    pub fn copy_recv_message_to(&self, dst: &mut [u8]) -> usize {
        let Some(message) = self.recv_message.as_ref() else {
            panic!("no inbound message to copy");
        };
        message.copy_to_slice(dst)
    }

    /// Moves the inbound payload out. Later calls return `None`.
    pub fn take_recv_message(&mut self) -> Option<ByteBuffer> {
        self.recv_message.take()
    }

    pub fn take_recv_message_reader(&mut self) -> Option<MessageReader> {
        self.take_recv_message().map(ByteBuffer::into_reader)
    }

    pub fn recv_status(&self) -> StatusCode {
        self.recv_status.status
    }

    pub fn recv_status_details(&self) -> &[u8] {
        &self.recv_status.details
    }

    pub fn recv_status_trailing_metadata(&self) -> &MetadataArray {
        &self.recv_status.trailing_metadata
    }

    pub fn recv_close_on_server_cancelled(&self) -> bool {
        self.recv_close_on_server_cancelled
    }

    /// Borrows every field at once so views and slots handed to the engine
    /// are all derived from one exclusive borrow of the context.
    pub(crate) fn stage(&mut self) -> Staging<'_> {
        Staging {
            send_initial_metadata: &mut self.send_initial_metadata,
            send_message: &mut self.send_message,
            send_status_trailing_metadata: &mut self.send_status_trailing_metadata,
            recv_initial_metadata: &mut self.recv_initial_metadata,
            recv_message: &mut self.recv_message,
            recv_status: &mut self.recv_status,
            recv_close_on_server_cancelled: &mut self.recv_close_on_server_cancelled,
            policy: self.policy,
        }
    }
}

impl Drop for BatchContext {
    fn drop(&mut self) {
        trace!(
            send_message = self.send_message.is_some(),
            recv_message = self.recv_message.is_some(),
            "releasing batch context"
        );
        self.send_initial_metadata.take().release_deep();
        self.send_status_trailing_metadata.take().release_deep();
        self.recv_initial_metadata.take().release_shallow();
        self.recv_status.trailing_metadata.take().release_shallow();
        self.recv_status.details = Bytes::new();
        self.send_message = None;
        self.recv_message = None;
    }
}

pub(crate) struct Staging<'a> {
    send_initial_metadata: &'a mut MetadataArray,
    send_message: &'a mut Option<ByteBuffer>,
    send_status_trailing_metadata: &'a mut MetadataArray,
    recv_initial_metadata: &'a mut MetadataArray,
    recv_message: &'a mut Option<ByteBuffer>,
    recv_status: &'a mut RecvStatus,
    recv_close_on_server_cancelled: &'a mut bool,
    policy: RpcPolicy,
}

impl Staging<'_> {
    pub(crate) fn check_enabled(&self) -> Result<(), CallError> {
        if self.policy.enabled {
            Ok(())
        } else {
            debug!("submission refused: rpc disabled by policy");
            Err(CallError::Error)
        }
    }

    /// Rejects an outbound payload the policy does not allow. Nothing has
    /// been installed when this fails.
    pub(crate) fn check_message(&self, data: &[u8]) -> Result<(), CallError> {
        if self.policy.allows_message(data.len()) {
            Ok(())
        } else {
            Err(CallError::InvalidMessage)
        }
    }

    pub(crate) fn send_initial_metadata(&mut self, src: Option<&mut MetadataArray>) -> MetadataView {
        self.send_initial_metadata.move_from(src);
        MetadataView::of(&*self.send_initial_metadata)
    }

    pub(crate) fn send_status_trailing_metadata(
        &mut self,
        src: Option<&mut MetadataArray>,
    ) -> MetadataView {
        self.send_status_trailing_metadata.move_from(src);
        MetadataView::of(&*self.send_status_trailing_metadata)
    }

    pub(crate) fn send_message(&mut self, data: &[u8]) -> MessageView {
        let chunk_bytes = self.policy.send_chunk_bytes as usize;
        let message = self
            .send_message
            .insert(ByteBuffer::from_copied_chunked(data, chunk_bytes));
        MessageView::of(message)
    }

    pub(crate) fn recv_initial_metadata(&mut self) -> Slot<MetadataArray> {
        Slot::new(&mut *self.recv_initial_metadata)
    }

    pub(crate) fn recv_message(&mut self) -> Slot<Option<ByteBuffer>> {
        Slot::new(&mut *self.recv_message)
    }

    pub(crate) fn recv_status(
        &mut self,
    ) -> (Slot<MetadataArray>, Slot<StatusCode>, Slot<Bytes>) {
        let RecvStatus {
            trailing_metadata,
            status,
            details,
        } = &mut *self.recv_status;
        (Slot::new(trailing_metadata), Slot::new(status), Slot::new(details))
    }

    pub(crate) fn recv_close_on_server(&mut self) -> Slot<bool> {
        Slot::new(&mut *self.recv_close_on_server_cancelled)
    }
}

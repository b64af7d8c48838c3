use std::fmt;

use tracing::{debug, trace};

use crate::engine::{CallDetails, CallRef, QueueHandle, RequestCallSlots, Server, Tag, Timespec};
use crate::metadata::MetadataArray;
use crate::op::Slot;
use crate::status::CallError;

/// Receives one call accepted by the server.
///
/// The engine fills the call reference, the call details and the request
/// metadata when the accept completes.
#[derive(Default)]
pub struct RequestCallContext {
    call: Option<CallRef>,
    details: CallDetails,
    metadata: MetadataArray,
}

impl fmt::Debug for RequestCallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCallContext")
            .field("call", &self.call.is_some())
            .field("details", &self.details)
            .field("metadata", &self.metadata.len())
            .finish()
    }
}

impl RequestCallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accepted call, still owned by the context.
    pub fn call(&self) -> Option<&CallRef> {
        self.call.as_ref()
    }

    /// A new reference to the accepted call that outlives the context.
    pub fn ref_call(&self) -> Option<CallRef> {
        self.call.clone()
    }

    pub fn details(&self) -> &CallDetails {
        &self.details
    }

    pub fn method(&self) -> &[u8] {
        &self.details.method
    }

    pub fn host(&self) -> &[u8] {
        &self.details.host
    }

    pub fn deadline(&self) -> Timespec {
        self.details.deadline
    }

    pub fn metadata(&self) -> &MetadataArray {
        &self.metadata
    }

    fn slots(&mut self) -> RequestCallSlots {
        let RequestCallContext {
            call,
            details,
            metadata,
        } = self;
        RequestCallSlots {
            call: Slot::new(call),
            details: Slot::new(details),
            metadata: Slot::new(metadata),
        }
    }
}

impl Drop for RequestCallContext {
    fn drop(&mut self) {
        trace!(call = self.call.is_some(), "releasing request-call context");
        self.call = None;
        self.metadata.take().release_shallow();
    }
}

/// Asks `server` to accept the next incoming call into `ctx` and to signal
/// `tag` on `cq` when it has.
///
/// # Safety
///
/// `ctx` must stay in place, and must not be read or dropped, until the
/// completion for `tag` has been delivered.
pub unsafe fn request_call(
    server: &dyn Server,
    cq: QueueHandle,
    ctx: &mut RequestCallContext,
    tag: Tag,
) -> Result<(), CallError> {
    let slots = ctx.slots();
    trace!(tag = tag.raw(), "requesting server call");
    server.request_call(slots, cq, tag).inspect_err(|err| {
        debug!(tag = tag.raw(), error = %err, "server rejected call request");
    })
}

//! The seam to the native engine.
//!
//! The core never talks to a transport. It hands typed descriptors to a
//! [`Call`], asks a [`Server`] to accept calls, and asks a [`Channel`] to
//! create them. Completion delivery stays with the completion queue the
//! engine owns; the core only round-trips the caller's [`Tag`].

use std::ffi::c_void;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::metadata::MetadataArray;
use crate::op::{Op, Slot};
use crate::status::CallError;

/// Caller-chosen correlation token, returned unmodified with the completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tag(usize);

impl Tag {
    pub const fn new(raw: usize) -> Self {
        Tag(raw)
    }

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Tag(ptr as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub fn raw(self) -> usize {
        self.0
    }
}

/// Opaque completion-queue handle. The core only passes it through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueueHandle(usize);

impl QueueHandle {
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        QueueHandle(ptr as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClockType {
    Monotonic = 0,
    #[default]
    Realtime = 1,
    Precise = 2,
    Timespan = 3,
}

impl ClockType {
    pub fn from_i32(raw: i32) -> Option<ClockType> {
        match raw {
            0 => Some(ClockType::Monotonic),
            1 => Some(ClockType::Realtime),
            2 => Some(ClockType::Precise),
            3 => Some(ClockType::Timespan),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timespec {
    pub tv_sec: i64,
    pub tv_nsec: i32,
    pub clock_type: ClockType,
}

impl Timespec {
    pub fn inf_future() -> Timespec {
        Timespec {
            tv_sec: i64::MAX,
            tv_nsec: 0,
            clock_type: ClockType::Realtime,
        }
    }
}

impl From<Duration> for Timespec {
    fn from(dur: Duration) -> Timespec {
        Timespec {
            tv_sec: i64::try_from(dur.as_secs()).unwrap_or(i64::MAX),
            tv_nsec: dur.subsec_nanos() as i32,
            clock_type: ClockType::Timespan,
        }
    }
}

/// Method, host and deadline of an accepted server call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallDetails {
    pub method: Bytes,
    pub host: Bytes,
    pub deadline: Timespec,
}

pub trait Call: Send + Sync {
    /// Submits `ops` as one batch. Completion is signalled once, through the
    /// completion queue, with `tag`.
    ///
    /// An `Err` means the batch was not accepted and no completion will be
    /// delivered for `tag`. Implementations must copy anything they need out
    /// of `ops` before returning.
    ///
    /// # Safety
    ///
    /// Every view and slot in `ops` must stay valid until the completion for
    /// `tag` has been delivered.
    unsafe fn start_batch(&self, ops: &[Op], tag: Tag) -> Result<(), CallError>;
}

/// A shared reference to an engine call. Dropping the last clone releases
/// the call.
pub type CallRef = Arc<dyn Call>;

/// Where the engine stores an accepted call.
#[derive(Clone, Copy, Debug)]
pub struct RequestCallSlots {
    pub call: Slot<Option<CallRef>>,
    pub details: Slot<CallDetails>,
    pub metadata: Slot<MetadataArray>,
}

pub trait Server: Send + Sync {
    /// Asks the engine to accept the next incoming call into `slots` and to
    /// signal `tag` on `cq` once it has.
    ///
    /// # Safety
    ///
    /// The slots must stay valid until the completion for `tag` has been
    /// delivered.
    unsafe fn request_call(
        &self,
        slots: RequestCallSlots,
        cq: QueueHandle,
        tag: Tag,
    ) -> Result<(), CallError>;
}

pub type ServerRef = Arc<dyn Server>;

pub trait Channel: Send + Sync {
    fn create_call(
        &self,
        parent: Option<&CallRef>,
        propagation_mask: u32,
        cq: QueueHandle,
        method: Bytes,
        host: Option<Bytes>,
        deadline: Timespec,
    ) -> Option<CallRef>;
}

pub type ChannelRef = Arc<dyn Channel>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_pointer_bits() {
        let mut anchor = 7u64;
        let ptr = &mut anchor as *mut u64 as *mut c_void;
        assert_eq!(Tag::from_ptr(ptr).as_ptr(), ptr);
        assert_eq!(Tag::new(42).raw(), 42);
    }

    #[test]
    fn duration_becomes_timespan() {
        let ts = Timespec::from(Duration::new(3, 250));
        assert_eq!(ts.tv_sec, 3);
        assert_eq!(ts.tv_nsec, 250);
        assert_eq!(ts.clock_type, ClockType::Timespan);
        assert_eq!(ClockType::from_i32(9), None);
        assert_eq!(Timespec::inf_future().tv_sec, i64::MAX);
    }
}

use bytes::Bytes;
use tracing::{debug, trace};

use crate::engine::{CallRef, Channel, QueueHandle, Timespec};

pub const PROPAGATE_DEADLINE: u32 = 0x1;
pub const PROPAGATE_CENSUS_STATS_CONTEXT: u32 = 0x2;
pub const PROPAGATE_CENSUS_TRACING_CONTEXT: u32 = 0x4;
pub const PROPAGATE_CANCELLATION: u32 = 0x8;
pub const PROPAGATE_DEFAULTS: u32 = 0xffff;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelArgValue {
    String(String),
    Integer(i32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelArg {
    pub key: String,
    pub value: ChannelArgValue,
}

/// A fixed number of channel-argument slots, filled by index.
#[derive(Clone, Debug, Default)]
pub struct ChannelArgs {
    args: Vec<Option<ChannelArg>>,
}

impl ChannelArgs {
    pub fn with_len(len: usize) -> Self {
        ChannelArgs {
            args: vec![None; len],
        }
    }

    /// Number of slots, set or not.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn set_string(&mut self, index: usize, key: &str, value: &str) {
        self.set(index, key, ChannelArgValue::String(value.to_owned()));
    }

    pub fn set_integer(&mut self, index: usize, key: &str, value: i32) {
        self.set(index, key, ChannelArgValue::Integer(value));
    }

    fn set(&mut self, index: usize, key: &str, value: ChannelArgValue) {
        assert!(
            index < self.args.len(),
            "channel arg index {index} out of range for {} slots",
            self.args.len()
        );
        self.args[index] = Some(ChannelArg {
            key: key.to_owned(),
            value,
        });
    }

    pub fn get(&self, index: usize) -> Option<&ChannelArg> {
        self.args.get(index).and_then(Option::as_ref)
    }

    /// Set slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelArg> {
        self.args.iter().flatten()
    }
}

/// Creates a call on `channel`. `method` and `host` are copied before the
/// channel sees them, so the caller's buffers may be reused right away.
pub fn create_call(
    channel: &dyn Channel,
    parent: Option<&CallRef>,
    propagation_mask: u32,
    cq: QueueHandle,
    method: &[u8],
    host: Option<&[u8]>,
    deadline: Timespec,
) -> Option<CallRef> {
    let method = Bytes::copy_from_slice(method);
    let host = host.map(Bytes::copy_from_slice);
    trace!(
        method = %String::from_utf8_lossy(&method),
        parent = parent.is_some(),
        propagation_mask,
        "creating call"
    );
    let call = channel.create_call(parent, propagation_mask, cq, method, host, deadline);
    if call.is_none() {
        debug!("channel refused to create call");
    }
    call
}

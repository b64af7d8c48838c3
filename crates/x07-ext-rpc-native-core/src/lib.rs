//! Batch-operation lifecycle for the native RPC engine.
//!
//! Callers build a [`BatchContext`], hand it to one of the [`assembler`]
//! builders together with their metadata and payload, and read the results
//! back from the context once the engine reports completion for the batch's
//! [`Tag`]. Dropping the context releases everything the batch owned.

pub mod assembler;
pub mod batch;
pub mod byte_buffer;
pub mod channel;
pub mod engine;
pub mod metadata;
pub mod op;
pub mod policy;
pub mod request_call;
pub mod status;

pub use assembler::{InitialMetadata, ServerStatus};
pub use batch::BatchContext;
pub use byte_buffer::{ByteBuffer, MessageReader};
pub use channel::{create_call, ChannelArg, ChannelArgValue, ChannelArgs};
pub use engine::{
    Call, CallDetails, CallRef, Channel, ChannelRef, ClockType, QueueHandle, RequestCallSlots,
    Server, ServerRef, Tag, Timespec,
};
pub use metadata::{Metadata, MetadataArray};
pub use op::{MessageView, MetadataView, Op, OpKind, Slot};
pub use policy::RpcPolicy;
pub use request_call::{request_call, RequestCallContext};
pub use status::{call_result_code, CallError, StatusCode};

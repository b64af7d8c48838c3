#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::OnceCell;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use x07_ext_rpc_native_core::assembler::{self, InitialMetadata, ServerStatus};
use x07_ext_rpc_native_core::{
    call_result_code, BatchContext, ByteBuffer, CallError, CallRef, ChannelArgs, ChannelRef,
    ClockType, MetadataArray, QueueHandle, RequestCallContext, RpcPolicy, ServerRef, StatusCode,
    Tag, Timespec,
};

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ev_bytes {
    pub ptr: *mut u8,
    pub len: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ev_rpc_timespec {
    pub tv_sec: i64,
    pub tv_nsec: i32,
    pub clock_type: i32,
}

extern "C" {
    fn ev_trap(code: i32) -> !;
}

const EV_TRAP_RPC_INTERNAL: i32 = 9800;
const EV_TRAP_RPC_CONTRACT: i32 = 9801;
const EV_TRAP_RPC_NULL_HANDLE: i32 = 9802;

pub const RECV_MESSAGE_ABSENT: usize = usize::MAX;

const ENV_RPC_LOG: &str = "X07_OS_RPC_LOG";

fn trap(code: i32) -> ! {
    unsafe { ev_trap(code) }
}

/// Runs `f`, turning any panic into an internal trap so it never unwinds
/// into the host.
fn guard<R>(f: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(_) => trap(EV_TRAP_RPC_INTERNAL),
    }
}

static POLICY: OnceCell<RpcPolicy> = OnceCell::new();

fn policy() -> &'static RpcPolicy {
    POLICY.get_or_init(RpcPolicy::from_env)
}

fn denied() -> Option<i32> {
    if policy().enabled {
        return None;
    }
    warn!("rpc submission denied by policy");
    Some(CallError::Error.code())
}

// -------------------------
// Pointer plumbing
// -------------------------

unsafe fn bytes_as_slice<'a>(b: ev_bytes) -> &'a [u8] {
    if b.len == 0 || b.ptr.is_null() {
        return &[];
    }
    std::slice::from_raw_parts(b.ptr as *const u8, b.len as usize)
}

/// A null pointer means "not supplied"; a non-null one may still be empty.
unsafe fn optional_bytes<'a>(b: ev_bytes) -> Option<&'a [u8]> {
    if b.ptr.is_null() {
        return None;
    }
    Some(bytes_as_slice(b))
}

fn bytes_view(b: &[u8]) -> ev_bytes {
    let Ok(len) = u32::try_from(b.len()) else {
        trap(EV_TRAP_RPC_INTERNAL);
    };
    ev_bytes {
        ptr: b.as_ptr() as *mut u8,
        len,
    }
}

unsafe fn handle<'a, T: ?Sized>(ptr: *const T) -> &'a T {
    match ptr.as_ref() {
        Some(v) => v,
        None => trap(EV_TRAP_RPC_NULL_HANDLE),
    }
}

unsafe fn handle_mut<'a, T: ?Sized>(ptr: *mut T) -> &'a mut T {
    match ptr.as_mut() {
        Some(v) => v,
        None => trap(EV_TRAP_RPC_NULL_HANDLE),
    }
}

fn check_index(len: usize, index: usize) -> Result<(), i32> {
    if index < len {
        Ok(())
    } else {
        Err(EV_TRAP_RPC_CONTRACT)
    }
}

fn check_recv_copy(ctx: &BatchContext, dst_len: usize) -> Result<(), i32> {
    match ctx.recv_message_len() {
        Some(len) if len <= dst_len => Ok(()),
        _ => Err(EV_TRAP_RPC_CONTRACT),
    }
}

fn check_buffer_copy(buf: &ByteBuffer, dst_len: usize) -> Result<(), i32> {
    if buf.len() <= dst_len {
        Ok(())
    } else {
        Err(EV_TRAP_RPC_CONTRACT)
    }
}

fn or_trap(res: Result<(), i32>) {
    if let Err(code) = res {
        trap(code);
    }
}

unsafe fn dst_slice<'a>(ptr: *mut u8, len: usize) -> &'a mut [u8] {
    if len == 0 || ptr.is_null() {
        return &mut [];
    }
    std::slice::from_raw_parts_mut(ptr, len)
}

fn timespec_in(ts: ev_rpc_timespec) -> Timespec {
    let Some(clock_type) = ClockType::from_i32(ts.clock_type) else {
        trap(EV_TRAP_RPC_CONTRACT);
    };
    Timespec {
        tv_sec: ts.tv_sec,
        tv_nsec: ts.tv_nsec,
        clock_type,
    }
}

fn timespec_out(ts: Timespec) -> ev_rpc_timespec {
    ev_rpc_timespec {
        tv_sec: ts.tv_sec,
        tv_nsec: ts.tv_nsec,
        clock_type: ts.clock_type as i32,
    }
}

/// Wraps an engine call in a handle the host can pass back. Release it with
/// [`x07_ext_rpc_call_unref_v1`].
pub fn call_into_raw(call: CallRef) -> *mut CallRef {
    Box::into_raw(Box::new(call))
}

pub fn server_into_raw(server: ServerRef) -> *mut ServerRef {
    Box::into_raw(Box::new(server))
}

pub fn channel_into_raw(channel: ChannelRef) -> *mut ChannelRef {
    Box::into_raw(Box::new(channel))
}

// -------------------------
// Metadata arrays
// -------------------------

#[no_mangle]
pub extern "C" fn x07_ext_rpc_metadata_array_create_v1(capacity: usize) -> *mut MetadataArray {
    guard(|| Box::into_raw(Box::new(MetadataArray::with_capacity(capacity))))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_metadata_array_add_v1(
    array: *mut MetadataArray,
    key: ev_bytes,
    value: ev_bytes,
) {
    let array = handle_mut(array);
    guard(|| array.add(bytes_as_slice(key), bytes_as_slice(value)))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_metadata_array_count_v1(array: *const MetadataArray) -> usize {
    handle(array).len()
}

/// Borrowed view of the key at `index`, valid until the array is next
/// modified or destroyed.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_metadata_array_get_key_v1(
    array: *const MetadataArray,
    index: usize,
) -> ev_bytes {
    let array = handle(array);
    or_trap(check_index(array.len(), index));
    bytes_view(array.key(index))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_metadata_array_get_value_v1(
    array: *const MetadataArray,
    index: usize,
) -> ev_bytes {
    let array = handle(array);
    or_trap(check_index(array.len(), index));
    bytes_view(array.value(index))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_metadata_array_shrink_to_fit_v1(array: *mut MetadataArray) {
    let array = handle_mut(array);
    guard(|| array.shrink_to_fit())
}

/// Moves `src` into `dest`, leaving `src` empty. A null `src` empties `dest`;
/// moving an array onto itself changes nothing.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_metadata_array_move_v1(
    dest: *mut MetadataArray,
    src: *mut MetadataArray,
) {
    if std::ptr::eq(dest, src) {
        return;
    }
    let dest = handle_mut(dest);
    guard(|| dest.move_from(src.as_mut()))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_metadata_array_destroy_v1(array: *mut MetadataArray) {
    if array.is_null() {
        return;
    }
    guard(|| Box::from_raw(array).release_deep())
}

// -------------------------
// Batch context
// -------------------------

#[no_mangle]
pub extern "C" fn x07_ext_rpc_batch_context_create_v1() -> *mut BatchContext {
    guard(|| Box::into_raw(Box::new(BatchContext::with_policy(*policy()))))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_destroy_v1(ctx: *mut BatchContext) {
    if ctx.is_null() {
        return;
    }
    guard(|| drop(Box::from_raw(ctx)))
}

/// Inbound payload length, or [`RECV_MESSAGE_ABSENT`].
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_recv_message_length_v1(
    ctx: *const BatchContext,
) -> usize {
    handle(ctx)
        .recv_message_len()
        .unwrap_or(RECV_MESSAGE_ABSENT)
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_recv_message_to_buffer_v1(
    ctx: *const BatchContext,
    buffer: *mut u8,
    buffer_len: usize,
) {
    let ctx = handle(ctx);
    or_trap(check_recv_copy(ctx, buffer_len));
    let dst = dst_slice(buffer, buffer_len);
    guard(|| {
        ctx.copy_recv_message_to(dst);
    })
}

/// Moves the inbound payload out as an owned buffer, or returns null when
/// there is none.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_take_recv_message_v1(
    ctx: *mut BatchContext,
) -> *mut ByteBuffer {
    let ctx = handle_mut(ctx);
    match ctx.take_recv_message() {
        Some(message) => Box::into_raw(Box::new(message)),
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_byte_buffer_length_v1(buf: *const ByteBuffer) -> usize {
    handle(buf).len()
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_byte_buffer_copy_to_v1(
    buf: *const ByteBuffer,
    buffer: *mut u8,
    buffer_len: usize,
) -> usize {
    let buf = handle(buf);
    or_trap(check_buffer_copy(buf, buffer_len));
    let dst = dst_slice(buffer, buffer_len);
    guard(|| buf.copy_to_slice(dst))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_byte_buffer_destroy_v1(buf: *mut ByteBuffer) {
    if buf.is_null() {
        return;
    }
    drop(Box::from_raw(buf));
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_recv_status_v1(ctx: *const BatchContext) -> i32 {
    handle(ctx).recv_status().code()
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_recv_status_details_v1(
    ctx: *const BatchContext,
) -> ev_bytes {
    bytes_view(handle(ctx).recv_status_details())
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_recv_status_trailing_metadata_v1(
    ctx: *const BatchContext,
) -> *const MetadataArray {
    handle(ctx).recv_status_trailing_metadata()
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_recv_initial_metadata_v1(
    ctx: *const BatchContext,
) -> *const MetadataArray {
    handle(ctx).recv_initial_metadata()
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_batch_context_recv_close_on_server_cancelled_v1(
    ctx: *const BatchContext,
) -> i32 {
    i32::from(handle(ctx).recv_close_on_server_cancelled())
}

// -------------------------
// Request-call context
// -------------------------

#[no_mangle]
pub extern "C" fn x07_ext_rpc_request_call_context_create_v1() -> *mut RequestCallContext {
    guard(|| Box::into_raw(Box::new(RequestCallContext::new())))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_request_call_context_destroy_v1(ctx: *mut RequestCallContext) {
    if ctx.is_null() {
        return;
    }
    guard(|| drop(Box::from_raw(ctx)))
}

/// A new owned call handle, or null when no call was accepted.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_request_call_context_ref_call_v1(
    ctx: *const RequestCallContext,
) -> *mut CallRef {
    match handle(ctx).ref_call() {
        Some(call) => call_into_raw(call),
        None => std::ptr::null_mut(),
    }
}

/// The call still owned by the context. Do not unref it.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_request_call_context_get_call_v1(
    ctx: *const RequestCallContext,
) -> *const CallRef {
    match handle(ctx).call() {
        Some(call) => call as *const CallRef,
        None => std::ptr::null(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_request_call_context_method_v1(
    ctx: *const RequestCallContext,
) -> ev_bytes {
    bytes_view(handle(ctx).method())
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_request_call_context_host_v1(
    ctx: *const RequestCallContext,
) -> ev_bytes {
    bytes_view(handle(ctx).host())
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_request_call_context_deadline_v1(
    ctx: *const RequestCallContext,
) -> ev_rpc_timespec {
    timespec_out(handle(ctx).deadline())
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_request_call_context_metadata_v1(
    ctx: *const RequestCallContext,
) -> *const MetadataArray {
    handle(ctx).metadata()
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_unref_v1(call: *mut CallRef) {
    if call.is_null() {
        return;
    }
    drop(Box::from_raw(call));
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_server_unref_v1(server: *mut ServerRef) {
    if server.is_null() {
        return;
    }
    drop(Box::from_raw(server));
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_channel_unref_v1(channel: *mut ChannelRef) {
    if channel.is_null() {
        return;
    }
    drop(Box::from_raw(channel));
}

// -------------------------
// Submissions
// -------------------------

/// Shared prologue for every submission: policy gate, then `f` under a
/// panic guard, flattened to the engine's integer code.
fn submit(f: impl FnOnce() -> Result<(), CallError>) -> i32 {
    if let Some(code) = denied() {
        return code;
    }
    call_result_code(guard(f))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_start_unary_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    send_buffer: ev_bytes,
    write_flags: u32,
    initial_metadata: *mut MetadataArray,
    initial_metadata_flags: u32,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| {
        assembler::start_unary(
            call.as_ref(),
            ctx,
            bytes_as_slice(send_buffer),
            write_flags,
            initial_metadata.as_mut(),
            initial_metadata_flags,
            Tag::from_ptr(tag),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_start_client_streaming_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    initial_metadata: *mut MetadataArray,
    initial_metadata_flags: u32,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| {
        assembler::start_client_streaming(
            call.as_ref(),
            ctx,
            initial_metadata.as_mut(),
            initial_metadata_flags,
            Tag::from_ptr(tag),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_start_server_streaming_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    send_buffer: ev_bytes,
    write_flags: u32,
    initial_metadata: *mut MetadataArray,
    initial_metadata_flags: u32,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| {
        assembler::start_server_streaming(
            call.as_ref(),
            ctx,
            bytes_as_slice(send_buffer),
            write_flags,
            initial_metadata.as_mut(),
            initial_metadata_flags,
            Tag::from_ptr(tag),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_start_duplex_streaming_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    initial_metadata: *mut MetadataArray,
    initial_metadata_flags: u32,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| {
        assembler::start_duplex_streaming(
            call.as_ref(),
            ctx,
            initial_metadata.as_mut(),
            initial_metadata_flags,
            Tag::from_ptr(tag),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_recv_initial_metadata_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| assembler::recv_initial_metadata(call.as_ref(), ctx, Tag::from_ptr(tag)))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_send_message_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    send_buffer: ev_bytes,
    write_flags: u32,
    send_empty_initial_metadata: i32,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| {
        assembler::send_message(
            call.as_ref(),
            ctx,
            bytes_as_slice(send_buffer),
            write_flags,
            send_empty_initial_metadata != 0,
            Tag::from_ptr(tag),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_send_close_from_client_v1(
    call: *const CallRef,
    tag: *mut c_void,
) -> i32 {
    let call = handle(call);
    submit(|| assembler::send_close_from_client(call.as_ref(), Tag::from_ptr(tag)))
}

/// A non-null `initial_metadata` is sent as the call's initial metadata;
/// otherwise `send_empty_initial_metadata` decides whether an empty set goes
/// out. A null `send_buffer` pointer sends no message.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_send_status_from_server_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    status_code: i32,
    status_details: ev_bytes,
    trailing_metadata: *mut MetadataArray,
    send_empty_initial_metadata: i32,
    initial_metadata: *mut MetadataArray,
    send_buffer: ev_bytes,
    write_flags: u32,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| {
        let status = ServerStatus {
            code: StatusCode::from(status_code),
            details: bytes_as_slice(status_details),
            trailing_metadata: trailing_metadata.as_mut(),
        };
        let initial_metadata = match initial_metadata.as_mut() {
            Some(md) => InitialMetadata::Caller(md),
            None if send_empty_initial_metadata != 0 => InitialMetadata::Empty,
            None => InitialMetadata::AlreadySent,
        };
        assembler::send_status_from_server(
            call.as_ref(),
            ctx,
            status,
            initial_metadata,
            optional_bytes(send_buffer),
            write_flags,
            Tag::from_ptr(tag),
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_recv_message_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| assembler::recv_message(call.as_ref(), ctx, Tag::from_ptr(tag)))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_start_serverside_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| assembler::start_serverside(call.as_ref(), ctx, Tag::from_ptr(tag)))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_send_initial_metadata_v1(
    call: *const CallRef,
    ctx: *mut BatchContext,
    initial_metadata: *mut MetadataArray,
    tag: *mut c_void,
) -> i32 {
    let (call, ctx) = (handle(call), handle_mut(ctx));
    submit(|| {
        assembler::send_initial_metadata(
            call.as_ref(),
            ctx,
            initial_metadata.as_mut(),
            Tag::from_ptr(tag),
        )
    })
}

/// Thread-safe: mutates no call state.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_call_kick_completion_queue_v1(
    call: *const CallRef,
    tag: *mut c_void,
) -> i32 {
    let call = handle(call);
    submit(|| assembler::kick_completion_queue(call.as_ref(), Tag::from_ptr(tag)))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_server_request_call_v1(
    server: *const ServerRef,
    cq: *mut c_void,
    ctx: *mut RequestCallContext,
    tag: *mut c_void,
) -> i32 {
    let (server, ctx) = (handle(server), handle_mut(ctx));
    submit(|| {
        x07_ext_rpc_native_core::request_call(
            server.as_ref(),
            QueueHandle::from_ptr(cq),
            ctx,
            Tag::from_ptr(tag),
        )
    })
}

// -------------------------
// Channel
// -------------------------

#[no_mangle]
pub extern "C" fn x07_ext_rpc_channel_args_create_v1(num_args: usize) -> *mut ChannelArgs {
    guard(|| Box::into_raw(Box::new(ChannelArgs::with_len(num_args))))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_channel_args_set_string_v1(
    args: *mut ChannelArgs,
    index: usize,
    key: ev_bytes,
    value: ev_bytes,
) {
    let args = handle_mut(args);
    or_trap(check_index(args.len(), index));
    let key = String::from_utf8_lossy(bytes_as_slice(key));
    let value = String::from_utf8_lossy(bytes_as_slice(value));
    guard(|| args.set_string(index, &key, &value))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_channel_args_set_integer_v1(
    args: *mut ChannelArgs,
    index: usize,
    key: ev_bytes,
    value: i32,
) {
    let args = handle_mut(args);
    or_trap(check_index(args.len(), index));
    let key = String::from_utf8_lossy(bytes_as_slice(key));
    guard(|| args.set_integer(index, &key, value))
}

#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_channel_args_destroy_v1(args: *mut ChannelArgs) {
    if args.is_null() {
        return;
    }
    drop(Box::from_raw(args));
}

/// Returns an owned call handle, or null when the channel refuses. A null
/// `host` pointer means no host override.
#[no_mangle]
pub unsafe extern "C" fn x07_ext_rpc_channel_create_call_v1(
    channel: *const ChannelRef,
    parent: *const CallRef,
    propagation_mask: u32,
    cq: *mut c_void,
    method: ev_bytes,
    host: ev_bytes,
    deadline: ev_rpc_timespec,
) -> *mut CallRef {
    let channel = handle(channel);
    let deadline = timespec_in(deadline);
    let created = guard(|| {
        x07_ext_rpc_native_core::create_call(
            channel.as_ref(),
            parent.as_ref(),
            propagation_mask,
            QueueHandle::from_ptr(cq),
            bytes_as_slice(method),
            optional_bytes(host),
            deadline,
        )
    });
    match created {
        Some(call) => call_into_raw(call),
        None => std::ptr::null_mut(),
    }
}

// -------------------------
// Logging
// -------------------------

/// Installs a stderr `tracing` subscriber filtered by `X07_OS_RPC_LOG`
/// (default `warn`). Returns 1 when installed, 0 if one already was.
#[no_mangle]
pub extern "C" fn x07_ext_rpc_log_init_v1() -> i32 {
    guard(|| {
        let filter =
            EnvFilter::try_from_env(ENV_RPC_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init()
            .is_ok();
        i32::from(installed)
    })
}

//! Typestate wrapper around device buffers of `f64`.
//!
//! `Queued` buffers exist on the device but hold no data yet, `InFlight`
//! buffers have a transfer or kernel pending, `Ready` buffers can be read.

use std::{ffi::c_void, marker::PhantomData, mem::size_of, ptr};

use bytemuck::{cast_slice, cast_slice_mut};
use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    event::Event,
    memory::Buffer,
    types::{cl_mem_flags, CL_BLOCKING, CL_NON_BLOCKING},
};

use crate::ClError;

// ─── Typestate markers ───────────────────────────────────────────────
mod sealed {
    pub trait Sealed {}
}

pub trait State: sealed::Sealed {}

pub struct Queued;
impl sealed::Sealed for Queued {}
impl State for Queued {}

pub struct InFlight;
impl sealed::Sealed for InFlight {}
impl State for InFlight {}

pub struct Ready;
impl sealed::Sealed for Ready {}
impl State for Ready {}

pub struct DeviceArray<S: State> {
    buf: Buffer<u8>,
    len: usize,
    _state: PhantomData<S>,
}

impl<S: State> std::fmt::Debug for DeviceArray<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceArray")
            .field("len", &self.len)
            .field("state", &std::any::type_name::<S>())
            .finish()
    }
}

fn byte_len(len: usize) -> Result<usize, ClError> {
    if len == 0 {
        return Err(ClError::InvalidSize(len));
    }
    len.checked_mul(size_of::<f64>())
        .ok_or(ClError::InvalidSize(len))
}

fn check_len(expected: usize, actual: usize) -> Result<(), ClError> {
    if expected != actual {
        return Err(ClError::LengthMismatch { expected, actual });
    }
    Ok(())
}

// ── Queued ───────────────────────────────────────────────────────────
impl DeviceArray<Queued> {
    /// Allocates `len` doubles on the device. `flags` are the
    /// `CL_MEM_*` access flags.
    pub fn new(ctx: &Context, flags: cl_mem_flags, len: usize) -> Result<Self, ClError> {
        let bytes = byte_len(len)?;
        let buf = unsafe { Buffer::<u8>::create(ctx, flags, bytes, ptr::null_mut::<c_void>())? };
        Ok(Self {
            buf,
            len,
            _state: PhantomData,
        })
    }

    /// Non-blocking host to device copy. The returned guard borrows `host`
    /// so the slice outlives the transfer.
    pub fn upload<'h>(
        mut self,
        queue: &CommandQueue,
        host: &'h [f64],
    ) -> Result<(DeviceArray<InFlight>, EventGuard<'h>), ClError> {
        check_len(self.len, host.len())?;

        #[cfg(feature = "metrics")]
        let t = std::time::Instant::now();

        let evt = unsafe {
            queue.enqueue_write_buffer(&mut self.buf, CL_NON_BLOCKING, 0, cast_slice(host), &[])?
        };

        #[cfg(feature = "metrics")]
        {
            crate::record("enqueue_write", t);
            crate::BYTES_MOVED.fetch_add(
                host.len() * size_of::<f64>(),
                std::sync::atomic::Ordering::Relaxed,
            );
        }

        Ok((self.launch(), EventGuard::new(evt)))
    }

    /// Hands the buffer to a kernel as output.
    pub fn launch(self) -> DeviceArray<InFlight> {
        DeviceArray {
            buf: self.buf,
            len: self.len,
            _state: PhantomData,
        }
    }
}

// ── InFlight ─────────────────────────────────────────────────────────
impl DeviceArray<InFlight> {
    /// Waits for the pending command and moves to `Ready`.
    pub fn into_ready(self, guard: EventGuard<'_>) -> Result<DeviceArray<Ready>, ClError> {
        guard.wait()?;
        Ok(DeviceArray {
            buf: self.buf,
            len: self.len,
            _state: PhantomData,
        })
    }
}

// ── Ready → Host (D2H) ───────────────────────────────────────────────
impl DeviceArray<Ready> {
    /// Blocking device to host copy into `host_out`.
    pub fn read_into(&self, queue: &CommandQueue, host_out: &mut [f64]) -> Result<(), ClError> {
        check_len(self.len, host_out.len())?;

        #[cfg(feature = "metrics")]
        let t = std::time::Instant::now();

        unsafe {
            queue.enqueue_read_buffer(&self.buf, CL_BLOCKING, 0, cast_slice_mut(host_out), &[])?;
        }

        #[cfg(feature = "metrics")]
        {
            crate::record("enqueue_read", t);
            crate::BYTES_MOVED.fetch_add(
                host_out.len() * size_of::<f64>(),
                std::sync::atomic::Ordering::Relaxed,
            );
        }
        Ok(())
    }

    pub fn to_vec(&self, queue: &CommandQueue) -> Result<Vec<f64>, ClError> {
        let mut out = vec![0.0; self.len];
        self.read_into(queue, &mut out)?;
        Ok(out)
    }
}

// ── Accessors (any state) ────────────────────────────────────────────
impl<S: State> DeviceArray<S> {
    pub fn raw(&self) -> &Buffer<u8> {
        &self.buf
    }

    /// Length in elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ── Guard (waits for the event on drop) ──────────────────────────────
pub struct EventGuard<'h> {
    evt: Option<Event>,
    _host: PhantomData<&'h [f64]>,
}

impl EventGuard<'_> {
    pub fn new(evt: Event) -> Self {
        Self {
            evt: Some(evt),
            _host: PhantomData,
        }
    }

    /// Explicit wait that surfaces the error the drop path would swallow.
    pub fn wait(mut self) -> Result<(), ClError> {
        match self.evt.take() {
            Some(evt) => evt.wait().map_err(ClError::from),
            None => Ok(()),
        }
    }
}

impl Drop for EventGuard<'_> {
    fn drop(&mut self) {
        if let Some(evt) = self.evt.take() {
            let _ = evt.wait();
        }
    }
}

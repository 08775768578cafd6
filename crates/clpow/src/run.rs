//! Context setup, program build and the single dispatch.

use std::ptr;

use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    device::Device,
    kernel::Kernel,
    memory::{CL_MEM_READ_ONLY, CL_MEM_READ_WRITE},
    program::Program,
    types::cl_ulong,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::buffer::{DeviceArray, Queued};
use crate::kernel::{host_pow, pow_kernel_source, ENTRY_POINT};
use crate::select::{find_device, find_platform};
use crate::ClError;

/// Elements per array.
pub const N: usize = 0xFF_FFFF;

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub len: usize,
    pub base: f64,
    pub exponent: f64,
    pub entry_point: &'static str,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            len: N,
            base: 0.1,
            exponent: 3.0,
            entry_point: ENTRY_POINT,
        }
    }
}

impl RunConfig {
    pub fn with_entry_point(entry_point: &'static str) -> Self {
        Self {
            entry_point,
            ..Self::default()
        }
    }

    /// Host input arrays `a` (all `base`) and `b` (all `exponent`).
    pub fn inputs(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![self.base; self.len], vec![self.exponent; self.len])
    }

    /// The value every output element should hold.
    pub fn expected(&self) -> f64 {
        self.base.powf(self.exponent)
    }
}

/// A built program bound to one device, ready to dispatch.
pub struct PowJob {
    context: Context,
    queue: CommandQueue,
    kernel: Kernel,
    entry_point: String,
}

impl PowJob {
    /// Creates context and queue for `device` and builds the kernel.
    ///
    /// On a failed build the log and the source go to stderr before the
    /// error is returned.
    pub fn build(device: &Device, entry_point: &str) -> Result<Self, ClError> {
        #[cfg(feature = "metrics")]
        let t = std::time::Instant::now();

        let context = Context::from_device(device)?;
        let queue = CommandQueue::create(&context, device.id(), 0)?;

        let src = pow_kernel_source(entry_point);
        let mut program = Program::create_from_source(&context, &src)?;
        if let Err(err) = program.build(&[device.id()], "") {
            let log = program.get_build_log(device.id()).unwrap_or_default();
            eprintln!(
                "CL program compilation error\n{log}\n/////////////////////////////////////\n{src}\n/////////////////////////////////////"
            );
            return Err(ClError::Build { code: err.0, log });
        }
        let kernel = Kernel::create(&program, entry_point)?;
        debug!(entry_point, "kernel built");

        #[cfg(feature = "metrics")]
        crate::record("build", t);

        Ok(Self {
            context,
            queue,
            kernel,
            entry_point: entry_point.to_owned(),
        })
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Uploads `a` and `b`, launches one work item per element and returns
    /// `c` with `c[i] = a[i].powf(b[i])`.
    pub fn run(&self, a: &[f64], b: &[f64]) -> Result<Vec<f64>, ClError> {
        if a.len() != b.len() {
            return Err(ClError::LengthMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        let n = a.len();

        let (a_if, a_guard) = DeviceArray::<Queued>::new(&self.context, CL_MEM_READ_ONLY, n)?
            .upload(&self.queue, a)?;
        let (b_if, b_guard) = DeviceArray::<Queued>::new(&self.context, CL_MEM_READ_ONLY, n)?
            .upload(&self.queue, b)?;
        let a_dev = a_if.into_ready(a_guard)?;
        let b_dev = b_if.into_ready(b_guard)?;
        let c_if = DeviceArray::<Queued>::new(&self.context, CL_MEM_READ_WRITE, n)?.launch();

        #[cfg(feature = "metrics")]
        let t = std::time::Instant::now();

        let n_arg = n as cl_ulong;
        let global = [n, 1, 1];
        let evt = unsafe {
            self.kernel.set_arg(0, &n_arg)?;
            self.kernel.set_arg(1, a_dev.raw())?;
            self.kernel.set_arg(2, b_dev.raw())?;
            self.kernel.set_arg(3, c_if.raw())?;
            self.queue.enqueue_nd_range_kernel(
                self.kernel.get(),
                1,
                ptr::null(),
                global.as_ptr(),
                ptr::null(),
                &[],
            )?
        };
        info!(entry_point = %self.entry_point, work_items = n, "kernel launched");

        let c_dev = c_if.into_ready(crate::EventGuard::new(evt))?;

        #[cfg(feature = "metrics")]
        crate::record("launch", t);

        c_dev.to_vec(&self.queue)
    }
}

/// Picks a uniformly random element of `values`.
pub fn sample<R: Rng + ?Sized>(values: &[f64], rng: &mut R) -> Option<(usize, f64)> {
    if values.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..values.len());
    Some((idx, values[idx]))
}

/// The whole sequence: platform, device, build, dispatch, read back,
/// spot check. Returns the sampled index and value.
pub fn execute(config: &RunConfig) -> Result<(usize, f64), ClError> {
    #[cfg(feature = "metrics")]
    let t = std::time::Instant::now();

    let platform = find_platform()?;
    let device = find_device(&platform)?;

    #[cfg(feature = "metrics")]
    crate::record("enumerate", t);

    let job = PowJob::build(&device, config.entry_point)?;
    let (a, b) = config.inputs();
    let c = job.run(&a, &b)?;

    let (idx, value) = sample(&c, &mut rand::thread_rng()).ok_or(ClError::InvalidSize(c.len()))?;
    let mut expected = [0.0];
    host_pow(&a[idx..=idx], &b[idx..=idx], &mut expected);
    if (value - expected[0]).abs() > expected[0].abs() * 1e-9 {
        warn!(idx, value, expected = expected[0], "device result differs from host reference");
    } else {
        debug!(idx, value, "spot check");
    }
    Ok((idx, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn default_config_matches_documented_inputs() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.len, 0xFFFFFF);
        assert_eq!(cfg.entry_point, "entry_point");
        assert!((cfg.expected() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn inputs_are_filled_with_base_and_exponent() {
        let cfg = RunConfig {
            len: 4,
            ..RunConfig::with_entry_point("vpow")
        };
        let (a, b) = cfg.inputs();
        assert_eq!(a, vec![0.1; 4]);
        assert_eq!(b, vec![3.0; 4]);
        assert_eq!(cfg.entry_point, "vpow");
    }

    #[test]
    fn sample_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = [1.0, 2.0, 3.0];
        for _ in 0..100 {
            let (idx, v) = sample(&values, &mut rng).unwrap();
            assert_eq!(values[idx], v);
        }
        assert_eq!(sample(&[], &mut rng), None);
    }
}

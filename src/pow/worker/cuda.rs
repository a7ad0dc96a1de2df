//! CUDA seal search
//!
//! One kernel launch tests `threads_per_block * update_interval` nonces; each
//! thread hashes a single nonce and the first hit is published with an atomic
//! compare-and-swap. Builds without the `cuda` feature keep the type so that
//! configuration code is identical, but construction always fails.

#[cfg(feature = "cuda")]
pub use device::CudaSolver;

#[cfg(not(feature = "cuda"))]
pub use unsupported::CudaSolver;

/// Limit as 32 big-endian bytes, the layout the kernel compares against.
#[cfg_attr(not(feature = "cuda"), allow(dead_code))]
fn limit_be_bytes(limit: &sp_core::U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, word) in limit.0.iter().rev().enumerate() {
        out[i * 8..(i + 1) * 8].copy_from_slice(&word.to_be_bytes());
    }
    out
}

#[cfg(feature = "cuda")]
mod device {
    use std::sync::Arc;

    use cudarc::driver::{CudaContext, CudaFunction, CudaSlice, CudaStream, LaunchConfig, PushKernelArg};
    use cudarc::nvrtc::compile_ptx;
    use tracing::{debug, info};

    use super::limit_be_bytes;
    use crate::error::{Error, Result};
    use crate::pow::puzzle::PowJob;
    use crate::pow::worker::HashSolver;

    const KERNEL_SRC: &str = include_str!("kernel.cu");
    const KERNEL_NAME: &str = "solve_seal";

    fn device_err(device: usize, what: &str, err: impl std::fmt::Debug) -> Error {
        Error::device_unavailable(format!("device {}: {}: {:?}", device, what, err))
    }

    /// Seal search on one CUDA device.
    pub struct CudaSolver {
        dev_id: usize,
        threads_per_block: u32,
        blocks_per_launch: u32,
        _ctx: Arc<CudaContext>,
        stream: Arc<CudaStream>,
        kernel: CudaFunction,
        block_and_key_hash: CudaSlice<u8>,
        limit: CudaSlice<u8>,
        found: CudaSlice<u32>,
        found_nonce: CudaSlice<u64>,
        /// Job currently on the device
        loaded: Option<(u64, u128, [u8; 32])>,
    }

    impl CudaSolver {
        /// Open `dev_id`, compile the kernel and allocate device buffers.
        pub fn new(dev_id: usize, threads_per_block: u32, update_interval: u64) -> Result<Self> {
            if threads_per_block == 0 {
                return Err(Error::InvalidParameter("threads per block must be > 0".to_string()));
            }
            let blocks_per_launch = u32::try_from(update_interval.max(1)).map_err(|_| {
                Error::InvalidParameter(format!(
                    "update interval {} exceeds the CUDA grid size",
                    update_interval
                ))
            })?;

            let ctx = CudaContext::new(dev_id).map_err(|e| device_err(dev_id, "open context", e))?;
            let stream = ctx.default_stream();

            let ptx = compile_ptx(KERNEL_SRC).map_err(|e| device_err(dev_id, "compile kernel", e))?;
            let module = ctx
                .load_module(ptx)
                .map_err(|e| device_err(dev_id, "load module", e))?;
            let kernel = module
                .load_function(KERNEL_NAME)
                .map_err(|e| device_err(dev_id, "load kernel", e))?;

            let block_and_key_hash = stream
                .alloc_zeros::<u8>(32)
                .map_err(|e| device_err(dev_id, "alloc", e))?;
            let limit = stream
                .alloc_zeros::<u8>(32)
                .map_err(|e| device_err(dev_id, "alloc", e))?;
            let found = stream
                .alloc_zeros::<u32>(1)
                .map_err(|e| device_err(dev_id, "alloc", e))?;
            let found_nonce = stream
                .alloc_zeros::<u64>(1)
                .map_err(|e| device_err(dev_id, "alloc", e))?;

            info!(
                device = dev_id,
                threads_per_block,
                blocks_per_launch,
                "CUDA solver ready"
            );

            Ok(Self {
                dev_id,
                threads_per_block,
                blocks_per_launch,
                _ctx: ctx,
                stream,
                kernel,
                block_and_key_hash,
                limit,
                found,
                found_nonce,
                loaded: None,
            })
        }

        fn load_job(&mut self, job: &PowJob) -> Result<()> {
            let key = (job.block_number, job.difficulty, job.block_and_key_hash);
            if self.loaded == Some(key) {
                return Ok(());
            }
            self.stream
                .memcpy_htod(&job.block_and_key_hash, &mut self.block_and_key_hash)
                .map_err(|e| device_err(self.dev_id, "upload job", e))?;
            self.stream
                .memcpy_htod(&limit_be_bytes(&job.limit), &mut self.limit)
                .map_err(|e| device_err(self.dev_id, "upload limit", e))?;
            self.loaded = Some(key);
            debug!(device = self.dev_id, block = job.block_number, "Loaded job on device");
            Ok(())
        }
    }

    impl HashSolver for CudaSolver {
        fn name(&self) -> String {
            format!("cuda{}", self.dev_id)
        }

        fn batch_size(&self) -> u64 {
            self.threads_per_block as u64 * self.blocks_per_launch as u64
        }

        fn solve_batch(&mut self, job: &PowJob, start: u64) -> Result<Option<(u64, [u8; 32])>> {
            self.load_job(job)?;
            self.stream
                .memcpy_htod(&[0u32], &mut self.found)
                .map_err(|e| device_err(self.dev_id, "reset flag", e))?;

            let cfg = LaunchConfig {
                grid_dim: (self.blocks_per_launch, 1, 1),
                block_dim: (self.threads_per_block, 1, 1),
                shared_mem_bytes: 0,
            };
            unsafe {
                let mut launch = self.stream.launch_builder(&self.kernel);
                launch
                    .arg(&self.block_and_key_hash)
                    .arg(&start)
                    .arg(&self.limit)
                    .arg(&mut self.found)
                    .arg(&mut self.found_nonce);
                launch
                    .launch(cfg)
                    .map_err(|e| device_err(self.dev_id, "launch", e))?;
            }
            self.stream
                .synchronize()
                .map_err(|e| device_err(self.dev_id, "synchronize", e))?;

            let found = self
                .stream
                .memcpy_dtov(&self.found)
                .map_err(|e| device_err(self.dev_id, "read flag", e))?;
            if found.first().copied().unwrap_or(0) == 0 {
                return Ok(None);
            }
            let nonce = self
                .stream
                .memcpy_dtov(&self.found_nonce)
                .map_err(|e| device_err(self.dev_id, "read nonce", e))?
                .first()
                .copied()
                .ok_or_else(|| Error::other("empty nonce buffer"))?;

            // The host predicate is authoritative.
            match job.check(nonce) {
                Some(seal) => Ok(Some((nonce, seal))),
                None => Err(Error::other(format!(
                    "device {} reported nonce {} that does not solve block {}",
                    self.dev_id, nonce, job.block_number
                ))),
            }
        }
    }
}

#[cfg(not(feature = "cuda"))]
mod unsupported {
    use crate::error::{Error, Result};
    use crate::pow::puzzle::PowJob;
    use crate::pow::worker::HashSolver;

    /// Placeholder for builds without GPU support.
    #[derive(Debug)]
    pub struct CudaSolver {
        _private: (),
    }

    impl CudaSolver {
        pub fn new(dev_id: usize, _threads_per_block: u32, _update_interval: u64) -> Result<Self> {
            Err(Error::device_unavailable(format!(
                "device {}: built without the `cuda` feature",
                dev_id
            )))
        }
    }

    impl HashSolver for CudaSolver {
        fn name(&self) -> String {
            "cuda".to_string()
        }

        fn batch_size(&self) -> u64 {
            0
        }

        fn solve_batch(&mut self, _job: &PowJob, _start: u64) -> Result<Option<(u64, [u8; 32])>> {
            Err(Error::device_unavailable("built without the `cuda` feature"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::U256;

    #[test]
    fn test_limit_bytes_are_big_endian() {
        let bytes = limit_be_bytes(&U256::from(0x0102u64));
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|b| *b == 0));
        assert_eq!(limit_be_bytes(&U256::MAX), [0xff; 32]);
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_cuda_unavailable_without_feature() {
        let err = CudaSolver::new(0, 256, 1_000).unwrap_err();
        assert!(matches!(err, crate::error::Error::DeviceUnavailable(_)));
    }
}

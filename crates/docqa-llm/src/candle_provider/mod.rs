//! Candle-backed BERT encoders: sentence embeddings and extractive QA.

pub mod embed;
pub mod hub;
pub mod qa;

pub use candle_core::Device;
pub use embed::CandleEmbedder;
pub use qa::{CandleExtractor, QaSettings};

/// Pick the accelerator compiled in, falling back to CPU.
#[must_use]
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => return device,
        Err(e) => tracing::warn!("metal device unavailable, using cpu: {e}"),
    }
    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => return device,
        Err(e) => tracing::warn!("cuda device unavailable, using cpu: {e}"),
    }
    Device::Cpu
}

#[must_use]
pub fn device_name(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}

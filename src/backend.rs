//! Backend selection
//!
//! The crate defaults to the portable `NdArray` CPU backend so training and
//! tests run everywhere. GPU execution is opt-in through the `wgpu` and
//! `cuda` cargo features.

use burn::backend::Autodiff;

#[cfg(feature = "cuda")]
pub type DefaultBackend = burn::backend::Cuda;

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(not(any(feature = "cuda", feature = "wgpu")))]
pub type DefaultBackend = burn::backend::NdArray;

/// The autodiff backend used for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device for the selected backend
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Human-readable name for the selected backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "cuda")]
    {
        "CUDA (GPU)"
    }
    #[cfg(all(feature = "wgpu", not(feature = "cuda")))]
    {
        "WGPU (GPU)"
    }
    #[cfg(not(any(feature = "cuda", feature = "wgpu")))]
    {
        "NdArray (CPU)"
    }
}

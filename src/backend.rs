//! Backend abstraction for mesh network computations.
//!
//! This module provides the `MeshBackend` trait that abstracts over
//! different Burn backends (NdArray, WGPU, CUDA), plus the helpers used to
//! move CPU data onto a device and back.

use burn::prelude::*;
use burn::tensor::TensorData;

/// Trait for backends the mesh layers are exercised on.
pub trait MeshBackend: Backend {
    /// Get the default device for this backend.
    fn default_device() -> Self::Device;
}

#[cfg(feature = "burn-ndarray")]
impl MeshBackend for burn_ndarray::NdArray {
    fn default_device() -> Self::Device {
        burn_ndarray::NdArrayDevice::Cpu
    }
}

#[cfg(feature = "burn-wgpu")]
impl MeshBackend for burn_wgpu::Wgpu {
    fn default_device() -> Self::Device {
        burn_wgpu::WgpuDevice::default()
    }
}

#[cfg(feature = "burn-cuda")]
impl MeshBackend for burn_cuda::Cuda {
    fn default_device() -> Self::Device {
        burn_cuda::CudaDevice::default()
    }
}

/// Create a float tensor from row-major `f32` data.
///
/// The data is converted to the backend's float element on upload.
#[inline]
pub fn float_tensor<B: Backend, const D: usize>(
    data: Vec<f32>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D> {
    Tensor::from_data(TensorData::new(data, shape.to_vec()), device)
}

/// Create a 1D index tensor.
#[inline]
pub fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let data: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    let len = data.len();
    Tensor::from_data(TensorData::new(data, vec![len]), device)
}

/// Download a float tensor as a flat row-major `Vec<f32>`.
///
/// # Panics
/// If the backend returns data that cannot be read as `f32` after conversion.
#[inline]
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .expect("f32 tensor data")
}

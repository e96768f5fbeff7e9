//! Bottleneck residual block on mesh data.
//!
//! Main branch:
//! 1x1 conv → (downsample) → BN → ReLU → MeshConv → BN → ReLU → 1x1 conv → BN
//!
//! Skip branch: identity when channels match and the block keeps its
//! level, otherwise 1x1 conv → (downsample) → BN.
//!
//! The two branches are summed and passed through a final ReLU.

use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Relu};
use burn::prelude::*;

use super::downsample::DownSamp;
use super::error::LayerError;
use super::mesh_conv::{MeshConv, MeshConvConfig};
use crate::mesh::MeshRegistry;
use crate::types::MeshLevel;

/// Configuration for a [`ResBlock`].
#[derive(Config, Debug)]
pub struct ResBlockConfig {
    pub in_chan: usize,
    /// Width of the mesh convolution in the middle of the block
    pub neck_chan: usize,
    pub out_chan: usize,
    /// Level of the block's input
    pub level: usize,
    /// Output on the next coarser level
    #[config(default = false)]
    pub coarsen: bool,
}

impl ResBlockConfig {
    /// Level the embedded mesh convolution runs on.
    ///
    /// A coarsening block downsamples before the mesh convolution, so the
    /// convolution uses the coarser level's bundle.
    pub fn mesh_level(&self) -> Result<MeshLevel, LayerError> {
        let level = MeshLevel::new(self.level);
        if !self.coarsen {
            return Ok(level);
        }
        level.coarser().ok_or_else(|| {
            LayerError::InvalidConfig(format!("cannot coarsen below level 0 (block at {})", level))
        })
    }

    pub fn init<B: Backend>(&self, registry: &MeshRegistry, device: &B::Device) -> Result<ResBlock<B>, LayerError> {
        let mesh_level = self.mesh_level()?;

        let conv_1a = Conv1dConfig::new(self.in_chan, self.neck_chan, 1).init(device);
        let bn_1a = BatchNormConfig::new(self.neck_chan).init(device);
        let conv_2a = MeshConvConfig::new(self.neck_chan, self.neck_chan).init(registry, mesh_level, device)?;
        let bn_2a = BatchNormConfig::new(self.neck_chan).init(device);
        let conv_3a = Conv1dConfig::new(self.neck_chan, self.out_chan, 1).init(device);
        let bn_3a = BatchNormConfig::new(self.out_chan).init(device);

        // Downsample target is the vertex count the mesh convolution expects
        let down = DownSamp::new(conv_2a.nv_in());
        let nv_in = if self.coarsen {
            registry.load(MeshLevel::new(self.level))?.nv
        } else {
            conv_2a.nv_in()
        };

        let skip = (self.in_chan != self.out_chan || self.coarsen).then(|| SkipProjection {
            conv: Conv1dConfig::new(self.in_chan, self.out_chan, 1).init(device),
            bn: BatchNormConfig::new(self.out_chan).init(device),
        });

        Ok(ResBlock {
            conv_1a,
            bn_1a,
            conv_2a,
            bn_2a,
            conv_3a,
            bn_3a,
            skip,
            down,
            relu: Relu::new(),
            coarsen: self.coarsen,
            in_chan: self.in_chan,
            out_chan: self.out_chan,
            level: self.level,
            nv_in,
        })
    }
}

/// 1x1 projection used on the skip path when shapes differ.
#[derive(Module, Debug)]
pub struct SkipProjection<B: Backend> {
    conv: Conv1d<B>,
    bn: BatchNorm<B, 1>,
}

/// Residual block wrapping one mesh convolution.
///
/// A coarsening block also loads the bundle of its input level to learn the
/// input vertex count, so both levels must be registered.
#[derive(Module, Debug)]
pub struct ResBlock<B: Backend> {
    conv_1a: Conv1d<B>,
    bn_1a: BatchNorm<B, 1>,
    conv_2a: MeshConv<B>,
    bn_2a: BatchNorm<B, 1>,
    conv_3a: Conv1d<B>,
    bn_3a: BatchNorm<B, 1>,
    skip: Option<SkipProjection<B>>,
    down: DownSamp,
    relu: Relu,
    coarsen: bool,
    in_chan: usize,
    out_chan: usize,
    /// Input level
    level: usize,
    /// Vertex count at the input level
    nv_in: usize,
}

impl<B: Backend> ResBlock<B> {
    pub fn out_chan(&self) -> usize {
        self.out_chan
    }

    /// Vertex count the input must have.
    pub fn nv_in(&self) -> usize {
        self.nv_in
    }

    /// Vertex count of the block's output.
    pub fn nv_out(&self) -> usize {
        self.conv_2a.nv_out()
    }

    /// Level of the embedded mesh convolution (and of the output).
    pub fn mesh_level(&self) -> MeshLevel {
        self.conv_2a.level()
    }

    /// Check an input shape against the block's channels and input level.
    pub fn check_input(&self, dims: [usize; 3]) -> Result<(), LayerError> {
        let level = MeshLevel::new(self.level);
        let [_, channels, nv] = dims;
        if channels != self.in_chan {
            return Err(LayerError::shape_mismatch(
                format!("ResBlock at {}", level),
                format!("{} input channels", self.in_chan),
                format!("{} channels", channels),
            ));
        }
        if nv != self.nv_in {
            return Err(LayerError::wrong_level("ResBlock", level, self.nv_in, nv));
        }
        Ok(())
    }

    /// Apply the block after checking the input shape.
    pub fn try_forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, LayerError> {
        self.check_input(x.dims())?;
        Ok(self.forward_unchecked(x))
    }

    /// # Panics
    /// If the input does not match the block's channels or input level. Use
    /// [`ResBlock::try_forward`] to get the error instead.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self.try_forward(x) {
            Ok(out) => out,
            Err(err) => panic!("{}", err),
        }
    }

    fn forward_unchecked(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let shortcut = match &self.skip {
            Some(skip) => {
                let s = skip.conv.forward(x.clone());
                let s = if self.coarsen { self.down.forward(s) } else { s };
                skip.bn.forward(s)
            }
            None => x.clone(),
        };

        let h = self.conv_1a.forward(x);
        let h = if self.coarsen { self.down.forward(h) } else { h };
        let h = self.relu.forward(self.bn_1a.forward(h));
        let h = self.relu.forward(self.bn_2a.forward(self.conv_2a.forward(h)));
        let h = self.bn_3a.forward(self.conv_3a.forward(h));

        self.relu.forward(h.add(shortcut))
    }
}

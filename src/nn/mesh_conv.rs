//! PDO mesh convolution.
//!
//! A mesh convolution replaces a grid kernel by a learned combination of
//! four differential operators evaluated at every vertex: the identity,
//! the Laplacian, and the derivatives along the east-west and north-south
//! directions. Each (output, input) channel pair owns four coefficients.
//!
//! One layer type covers both directions:
//! - [`PdoDirection::Forward`] with stride 1 keeps the resolution, stride 2
//!   evaluates the output on the next coarser level
//! - [`PdoDirection::Transpose`] (stride 2 only) takes input from the next
//!   coarser level, pads it to the bundle level and evaluates there
//!
//! The transposed layer pads with **ones**, not zeros. `G` and `L`
//! annihilate constants, so the padding contributes only through the
//! identity term and through faces that straddle the old and new vertices.

use burn::module::{Ignored, Param};
use burn::nn::Initializer;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::LayerError;
use super::kernels::{combine_pdo_terms, pad_vertices, pdo_terms, N_PDO_TERMS};
use crate::mesh::{MeshBundle, MeshOperators, MeshRegistry, Resolution};
use crate::types::MeshLevel;

/// Value appended to every new vertex by the transposed convolution.
pub const TRANSPOSE_PAD_VALUE: f32 = 1.0;

/// Whether the layer keeps/reduces resolution or increases it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdoDirection {
    Forward,
    Transpose,
}

/// Configuration for a [`MeshConv`] layer.
#[derive(Config, Debug)]
pub struct MeshConvConfig {
    /// Number of input channels
    pub in_channels: usize,
    /// Number of output channels
    pub out_channels: usize,
    /// 1 keeps the resolution, 2 changes it by one level
    #[config(default = 1)]
    pub stride: usize,
    /// Learn a per-channel bias
    #[config(default = true)]
    pub bias: bool,
    #[config(default = "PdoDirection::Forward")]
    pub direction: PdoDirection,
}

impl MeshConvConfig {
    /// Configuration for a transposed (refining) convolution.
    pub fn transpose(in_channels: usize, out_channels: usize) -> Self {
        Self::new(in_channels, out_channels)
            .with_stride(2)
            .with_direction(PdoDirection::Transpose)
    }

    /// Resolution change implied by direction and stride.
    pub fn resolution(&self) -> Result<Resolution, LayerError> {
        match (self.direction, self.stride) {
            (PdoDirection::Forward, 1) => Ok(Resolution::Same),
            (PdoDirection::Forward, 2) => Ok(Resolution::Coarsen),
            (PdoDirection::Transpose, 2) => Ok(Resolution::Refine),
            (PdoDirection::Forward, stride) => Err(LayerError::UnsupportedStride {
                stride,
                operator: "MeshConv",
                supported: "1 or 2",
            }),
            (PdoDirection::Transpose, stride) => Err(LayerError::UnsupportedStride {
                stride,
                operator: "MeshConvTranspose",
                supported: "2",
            }),
        }
    }

    /// Load the bundle of `level` from the registry and build the layer.
    pub fn init<B: Backend>(
        &self,
        registry: &MeshRegistry,
        level: MeshLevel,
        device: &B::Device,
    ) -> Result<MeshConv<B>, LayerError> {
        // Reject the stride before touching the file system
        self.resolution()?;
        let bundle = registry.load(level)?;
        self.init_with_bundle(&bundle, device)
    }

    /// Build the layer from an already loaded bundle.
    pub fn init_with_bundle<B: Backend>(
        &self,
        bundle: &MeshBundle,
        device: &B::Device,
    ) -> Result<MeshConv<B>, LayerError> {
        let resolved = bundle.resolve(self.resolution()?)?;
        let operators = MeshOperators::from_resolved(&resolved, device);

        // Uniform in ±1/sqrt(fan_in), fan_in counting every basis term
        let fan_in = self.in_channels * N_PDO_TERMS;
        let stdv = 1.0 / (fan_in.max(1) as f64).sqrt();
        let init = Initializer::Uniform {
            min: -stdv,
            max: stdv,
        };

        let coeffs = init.init([self.out_channels, self.in_channels, N_PDO_TERMS], device);
        let bias = self.bias.then(|| init.init([self.out_channels], device));

        Ok(MeshConv {
            coeffs,
            bias,
            operators,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            level: bundle.level.get(),
            direction: Ignored(self.direction),
        })
    }
}

/// PDO convolution on one mesh level.
///
/// Input: [batch, in_channels, nv_in], output: [batch, out_channels, nv_out],
/// where the vertex counts follow from the bundle level and the direction.
#[derive(Module, Debug)]
pub struct MeshConv<B: Backend> {
    /// Coefficients: [out_channels, in_channels, 4]
    pub coeffs: Param<Tensor<B, 3>>,
    /// Bias: [out_channels]
    pub bias: Option<Param<Tensor<B, 1>>>,
    operators: MeshOperators<B>,
    in_channels: usize,
    out_channels: usize,
    level: usize,
    direction: Ignored<PdoDirection>,
}

impl<B: Backend> MeshConv<B> {
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Level of the bundle the layer was built with.
    pub fn level(&self) -> MeshLevel {
        MeshLevel::new(self.level)
    }

    pub fn direction(&self) -> PdoDirection {
        self.direction.0
    }

    /// Vertex count the input must have.
    pub fn nv_in(&self) -> usize {
        self.operators.nv_in
    }

    /// Vertex count of the output.
    pub fn nv_out(&self) -> usize {
        self.operators.nv_out
    }

    /// Check an input shape against the layer.
    pub fn check_input(&self, dims: [usize; 3]) -> Result<(), LayerError> {
        let name = match self.direction() {
            PdoDirection::Forward => "MeshConv",
            PdoDirection::Transpose => "MeshConvTranspose",
        };
        let [_, channels, nv] = dims;
        if channels != self.in_channels {
            return Err(LayerError::shape_mismatch(
                format!("{} at {}", name, self.level()),
                format!("{} input channels", self.in_channels),
                format!("{} channels", channels),
            ));
        }
        if nv != self.nv_in() {
            return Err(LayerError::wrong_level(name, self.level(), self.nv_in(), nv));
        }
        Ok(())
    }

    /// Apply the convolution after checking the input shape.
    pub fn try_forward(&self, input: Tensor<B, 3>) -> Result<Tensor<B, 3>, LayerError> {
        self.check_input(input.dims())?;
        Ok(self.forward_unchecked(input))
    }

    /// Apply the convolution.
    ///
    /// # Panics
    /// If the input's channel or vertex count does not match the layer; the
    /// message names the layer's mesh level. Use [`MeshConv::try_forward`]
    /// to get the error instead.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        match self.try_forward(input) {
            Ok(out) => out,
            Err(err) => panic!("{}", err),
        }
    }

    fn forward_unchecked(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let input = match self.direction() {
            PdoDirection::Forward => input,
            PdoDirection::Transpose => pad_vertices(input, self.operators.n_pad(), TRANSPOSE_PAD_VALUE),
        };

        let terms = pdo_terms(&self.operators, input);
        combine_pdo_terms(
            terms,
            self.coeffs.val(),
            self.bias.as_ref().map(|b| b.val()),
        )
    }
}

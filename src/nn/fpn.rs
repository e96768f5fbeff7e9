//! Spherical feature-pyramid network.
//!
//! ```text
//! level      encoder                 decoder (pyramid)          detection
//! max   in_conv ─┐
//!  ..     Down ──┼─ skip ─────────► Up ── x_u[n_up] ── 1x1 ──┐
//!  ..     Down ──┼─ skip ──► Up ── x_u[1] ── T ... T ────────┤ sum ── head ── out
//! min     Down ──┴─ cross ── x_u[0] ──────── T ... T ────────┘
//! ```
//!
//! `T` is a transposed mesh convolution (one level up). The head refines
//! the fused pyramid from its top level to `max_level`.
//!
//! Everything the network builds is described by a [`PyramidPlan`], a pure
//! function of the configuration. Construction walks the plan; nothing is
//! derived from loop state.

use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::prelude::*;

use super::error::LayerError;
use super::mesh_conv::{MeshConv, MeshConvConfig};
use super::res_block::{ResBlock, ResBlockConfig};
use crate::mesh::MeshRegistry;
use crate::types::MeshLevel;

/// Maximum number of Up stages in the decoder.
pub const MAX_UP_STAGES: usize = 3;

/// One layer of the plan: channels in/out and the mesh level whose bundle it uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSpec {
    pub level: MeshLevel,
    pub in_channels: usize,
    pub out_channels: usize,
}

impl StageSpec {
    fn new(level: usize, in_channels: usize, out_channels: usize) -> Self {
        Self {
            level: MeshLevel::new(level),
            in_channels,
            out_channels,
        }
    }
}

/// Chained transposed convolutions, or a single 1x1 conv when no level change is needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsampleSpec {
    Transposed(Vec<StageSpec>),
    Pointwise { in_channels: usize, out_channels: usize },
}

/// Declarative description of a [`SphericalFpn`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PyramidPlan {
    /// Initial stride-1 mesh convolution at `max_level`
    pub in_conv: StageSpec,
    /// Coarsening residual blocks; `level` is the output level
    pub encoder: Vec<StageSpec>,
    /// 1x1 cross-connection at `min_level`
    pub cross: StageSpec,
    /// Up stages; `level` is the target level, `in_channels` the skip width
    pub up: Vec<StageSpec>,
    /// One entry per pyramid level, coarsest first
    pub detection: Vec<UpsampleSpec>,
    /// Refinement from the top pyramid level to `max_level`
    pub head: UpsampleSpec,
}

impl PyramidPlan {
    /// Compute the plan for a configuration.
    pub fn new(config: &SphericalFpnConfig) -> Result<Self, LayerError> {
        if config.max_level <= config.min_level {
            return Err(LayerError::InvalidConfig(format!(
                "max_level ({}) must exceed min_level ({})",
                config.max_level, config.min_level
            )));
        }
        if config.fdim == 0 || config.fpn_dim == 0 || config.det_dim == 0 {
            return Err(LayerError::InvalidConfig(
                "channel widths must be positive".to_string(),
            ));
        }

        let levels = config.max_level - config.min_level;
        let width = |i: usize| config.fdim << i;

        let in_conv = StageSpec::new(config.max_level, config.in_ch, config.fdim);

        let encoder = (0..levels)
            .map(|i| StageSpec::new(config.max_level - i - 1, width(i), width(i + 1)))
            .collect();

        let cross = StageSpec::new(config.min_level, width(levels), config.fpn_dim);

        let n_up = levels.min(MAX_UP_STAGES);
        let up = (0..n_up)
            .map(|i| StageSpec::new(config.min_level + i + 1, width(levels - i - 1), config.fpn_dim))
            .collect();

        // Pyramid level k sits at min_level + k; bring everything to the top
        let top = config.min_level + n_up;
        let detection = (0..=n_up)
            .map(|k| {
                if k == n_up {
                    return UpsampleSpec::Pointwise {
                        in_channels: config.fpn_dim,
                        out_channels: config.det_dim,
                    };
                }
                let steps = (config.min_level + k + 1..=top)
                    .enumerate()
                    .map(|(j, level)| {
                        let in_channels = if j == 0 { config.fpn_dim } else { config.det_dim };
                        StageSpec::new(level, in_channels, config.det_dim)
                    })
                    .collect();
                UpsampleSpec::Transposed(steps)
            })
            .collect();

        let head = if top == config.max_level {
            UpsampleSpec::Pointwise {
                in_channels: config.det_dim,
                out_channels: config.out_ch,
            }
        } else {
            let steps = (top + 1..=config.max_level)
                .map(|level| {
                    let out_channels = if level == config.max_level { config.out_ch } else { config.det_dim };
                    StageSpec::new(level, config.det_dim, out_channels)
                })
                .collect();
            UpsampleSpec::Transposed(steps)
        };

        Ok(Self {
            in_conv,
            encoder,
            cross,
            up,
            detection,
            head,
        })
    }

    /// Every mesh level some layer of the plan loads a bundle for.
    pub fn required_levels(&self) -> Vec<MeshLevel> {
        let mut levels = vec![self.in_conv.level];
        levels.extend(self.encoder.iter().map(|s| s.level));
        levels.extend(self.up.iter().map(|s| s.level));
        for spec in self.detection.iter().chain(std::iter::once(&self.head)) {
            if let UpsampleSpec::Transposed(steps) = spec {
                levels.extend(steps.iter().map(|s| s.level));
            }
        }
        levels.sort();
        levels.dedup();
        levels
    }
}

/// Encoder stage: coarsening residual block with `neck = in`.
#[derive(Module, Debug)]
pub struct Down<B: Backend> {
    conv: ResBlock<B>,
}

impl<B: Backend> Down<B> {
    /// Build a stage whose output lives on `level`.
    pub fn new(
        in_ch: usize,
        out_ch: usize,
        level: MeshLevel,
        registry: &MeshRegistry,
        device: &B::Device,
    ) -> Result<Self, LayerError> {
        let conv = ResBlockConfig::new(in_ch, in_ch, out_ch, level.finer().get())
            .with_coarsen(true)
            .init(registry, device)?;
        Ok(Self { conv })
    }

    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.conv.forward(x)
    }
}

/// Decoder stage: refine the previous pyramid tensor and add a cross-connection.
#[derive(Module, Debug)]
pub struct Up<B: Backend> {
    up: MeshConv<B>,
    conv: Conv1d<B>,
}

impl<B: Backend> Up<B> {
    /// Build a stage that refines to `level`, using that level's bundle.
    pub fn new(
        in_ch: usize,
        out_ch: usize,
        level: MeshLevel,
        registry: &MeshRegistry,
        device: &B::Device,
    ) -> Result<Self, LayerError> {
        Ok(Self {
            up: MeshConvConfig::transpose(out_ch, out_ch).init(registry, level, device)?,
            conv: Conv1dConfig::new(in_ch, out_ch, 1).init(device),
        })
    }

    /// # Arguments
    /// * `x1` - Previous pyramid tensor, one level coarser
    /// * `x2` - Encoder tensor at the target level
    pub fn forward(&self, x1: Tensor<B, 3>, x2: Tensor<B, 3>) -> Tensor<B, 3> {
        self.up.forward(x1).add(self.conv.forward(x2))
    }
}

/// Realisation of an [`UpsampleSpec`].
#[derive(Module, Debug)]
pub struct UpsamplePath<B: Backend> {
    steps: Vec<MeshConv<B>>,
    pointwise: Option<Conv1d<B>>,
}

impl<B: Backend> UpsamplePath<B> {
    fn new(spec: &UpsampleSpec, registry: &MeshRegistry, device: &B::Device) -> Result<Self, LayerError> {
        match spec {
            UpsampleSpec::Transposed(steps) => {
                let steps = steps
                    .iter()
                    .map(|s| MeshConvConfig::transpose(s.in_channels, s.out_channels).init(registry, s.level, device))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self { steps, pointwise: None })
            }
            UpsampleSpec::Pointwise {
                in_channels,
                out_channels,
            } => Ok(Self {
                steps: Vec::new(),
                pointwise: Some(Conv1dConfig::new(*in_channels, *out_channels, 1).init(device)),
            }),
        }
    }

    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.steps.iter().fold(x, |x, step| step.forward(x));
        match &self.pointwise {
            Some(conv) => conv.forward(x),
            None => x,
        }
    }
}

/// Configuration for a [`SphericalFpn`].
#[derive(Config, Debug)]
pub struct SphericalFpnConfig {
    /// Input channels
    pub in_ch: usize,
    /// Output channels
    pub out_ch: usize,
    /// Finest level (input and output resolution)
    #[config(default = 5)]
    pub max_level: usize,
    /// Coarsest level reached by the encoder
    #[config(default = 0)]
    pub min_level: usize,
    /// Channels after the initial convolution; doubled per encoder stage
    #[config(default = 16)]
    pub fdim: usize,
    /// Pyramid width
    #[config(default = 256)]
    pub fpn_dim: usize,
    /// Width of the detection stage
    #[config(default = 128)]
    pub det_dim: usize,
}

impl SphericalFpnConfig {
    pub fn plan(&self) -> Result<PyramidPlan, LayerError> {
        PyramidPlan::new(self)
    }

    /// Build the network, loading bundles from `registry`.
    pub fn init<B: Backend>(&self, registry: &MeshRegistry, device: &B::Device) -> Result<SphericalFpn<B>, LayerError> {
        let plan = self.plan()?;

        let in_conv = MeshConvConfig::new(plan.in_conv.in_channels, plan.in_conv.out_channels).init(
            registry,
            plan.in_conv.level,
            device,
        )?;
        let down = plan
            .encoder
            .iter()
            .map(|s| Down::new(s.in_channels, s.out_channels, s.level, registry, device))
            .collect::<Result<Vec<_>, _>>()?;
        let cross_conv = Conv1dConfig::new(plan.cross.in_channels, plan.cross.out_channels, 1).init(device);
        let up = plan
            .up
            .iter()
            .map(|s| Up::new(s.in_channels, s.out_channels, s.level, registry, device))
            .collect::<Result<Vec<_>, _>>()?;
        let detection = plan
            .detection
            .iter()
            .map(|spec| UpsamplePath::new(spec, registry, device))
            .collect::<Result<Vec<_>, _>>()?;
        let head = UpsamplePath::new(&plan.head, registry, device)?;

        let network = SphericalFpn {
            in_conv,
            down,
            cross_conv,
            up,
            detection,
            head,
        };

        tracing::info!(
            max_level = self.max_level,
            min_level = self.min_level,
            up_stages = plan.up.len(),
            params = network.num_params(),
            "assembled spherical FPN"
        );

        Ok(network)
    }
}

/// Feature-pyramid network on an icosahedral mesh hierarchy.
///
/// Input [batch, in_ch, nv(max_level)] → output [batch, out_ch, nv(max_level)].
#[derive(Module, Debug)]
pub struct SphericalFpn<B: Backend> {
    in_conv: MeshConv<B>,
    down: Vec<Down<B>>,
    cross_conv: Conv1d<B>,
    up: Vec<Up<B>>,
    detection: Vec<UpsamplePath<B>>,
    head: UpsamplePath<B>,
}

impl<B: Backend> SphericalFpn<B> {
    /// Run the network after checking the input against the finest level.
    pub fn try_forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, LayerError> {
        self.in_conv.check_input(x.dims())?;
        Ok(self.forward(x))
    }

    /// # Panics
    /// If the input does not match `in_ch` channels at `max_level`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        // Encoder, finest first
        let mut x_d = vec![self.in_conv.forward(x)];
        for stage in &self.down {
            let next = stage.forward(x_d[x_d.len() - 1].clone());
            x_d.push(next);
        }

        // Pyramid, coarsest first; Up stage i pairs with encoder tensor levels-1-i
        let levels = self.down.len();
        let mut x_u = vec![self.cross_conv.forward(x_d[levels].clone())];
        for (i, stage) in self.up.iter().enumerate() {
            let next = stage.forward(x_u[i].clone(), x_d[levels - 1 - i].clone());
            x_u.push(next);
        }

        let fused = self
            .detection
            .iter()
            .zip(x_u)
            .map(|(path, x)| path.forward(x))
            .reduce(|acc, x| acc.add(x));

        match fused {
            Some(fused) => self.head.forward(fused),
            // The plan always has at least one pyramid level
            None => unreachable!("pyramid without levels"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_matches_reference_architecture() {
        let config = SphericalFpnConfig::new(4, 15).with_fdim(32);
        let plan = config.plan().unwrap();

        assert_eq!(plan.in_conv, StageSpec::new(5, 4, 32));
        assert_eq!(
            plan.encoder,
            vec![
                StageSpec::new(4, 32, 64),
                StageSpec::new(3, 64, 128),
                StageSpec::new(2, 128, 256),
                StageSpec::new(1, 256, 512),
                StageSpec::new(0, 512, 1024),
            ]
        );
        assert_eq!(plan.cross, StageSpec::new(0, 1024, 256));
        assert_eq!(
            plan.up,
            vec![
                StageSpec::new(1, 512, 256),
                StageSpec::new(2, 256, 256),
                StageSpec::new(3, 128, 256),
            ]
        );

        assert_eq!(
            plan.detection,
            vec![
                UpsampleSpec::Transposed(vec![
                    StageSpec::new(1, 256, 128),
                    StageSpec::new(2, 128, 128),
                    StageSpec::new(3, 128, 128),
                ]),
                UpsampleSpec::Transposed(vec![StageSpec::new(2, 256, 128), StageSpec::new(3, 128, 128)]),
                UpsampleSpec::Transposed(vec![StageSpec::new(3, 256, 128)]),
                UpsampleSpec::Pointwise {
                    in_channels: 256,
                    out_channels: 128
                },
            ]
        );
        assert_eq!(
            plan.head,
            UpsampleSpec::Transposed(vec![StageSpec::new(4, 128, 128), StageSpec::new(5, 128, 15)])
        );
    }

    #[test]
    fn test_plan_single_level() {
        let config = SphericalFpnConfig::new(3, 2)
            .with_max_level(1)
            .with_fdim(4)
            .with_fpn_dim(8)
            .with_det_dim(6);
        let plan = config.plan().unwrap();

        assert_eq!(plan.encoder, vec![StageSpec::new(0, 4, 8)]);
        assert_eq!(plan.up, vec![StageSpec::new(1, 4, 8)]);
        assert_eq!(plan.detection.len(), 2);
        assert_eq!(plan.detection[0], UpsampleSpec::Transposed(vec![StageSpec::new(1, 8, 6)]));
        assert_eq!(
            plan.head,
            UpsampleSpec::Pointwise {
                in_channels: 6,
                out_channels: 2
            }
        );
        assert_eq!(plan.required_levels(), vec![MeshLevel::new(0), MeshLevel::new(1)]);
    }

    #[test]
    fn test_plan_offset_min_level() {
        let config = SphericalFpnConfig::new(1, 1).with_min_level(2).with_max_level(4);
        let plan = config.plan().unwrap();
        assert_eq!(plan.up.len(), 2);
        assert_eq!(plan.up[0].level, MeshLevel::new(3));
        assert_eq!(plan.cross.level, MeshLevel::new(2));
        // Top pyramid level is max_level: pointwise head
        assert!(matches!(plan.head, UpsampleSpec::Pointwise { .. }));
        assert_eq!(
            plan.required_levels(),
            vec![MeshLevel::new(2), MeshLevel::new(3), MeshLevel::new(4)]
        );
    }

    #[test]
    fn test_plan_rejects_empty_hierarchy() {
        let config = SphericalFpnConfig::new(1, 1).with_min_level(3).with_max_level(3);
        assert!(matches!(config.plan(), Err(LayerError::InvalidConfig(_))));
    }

    #[test]
    fn test_plan_rejects_zero_width() {
        let config = SphericalFpnConfig::new(1, 1).with_fpn_dim(0);
        assert!(matches!(config.plan(), Err(LayerError::InvalidConfig(_))));
    }
}

use super::{
    config::{KERNEL_SIZE, STRIDE},
    ConvBlockConfig,
};
use crate::{
    error::ModelError,
    model::SubModel,
    util::{check_device, leaky_relu_gain, orthogonal_, LEAKY_RELU_SLOPE},
};
use log::trace;
use tch::{nn, nn::Module, Device, Kind, Tensor};

/// Four orthogonally initialized convolutions with leaky ReLU, followed by an
/// average pooling and flattening.
///
/// The output keeps the batch dimension: `[N, C, H, W]` becomes `[N, D]`.
pub struct ConvBlock {
    n_stack: i64,
    device: Device,
    seq: nn::Sequential,
}

impl ConvBlock {
    fn conv(p: nn::Path, c_in: i64, c_out: i64) -> nn::Conv2D {
        let config = nn::ConvConfig {
            stride: STRIDE,
            padding: KERNEL_SIZE / 2,
            bs_init: nn::Init::Const(0.),
            ..Default::default()
        };
        let mut conv = nn::conv2d(p, c_in, c_out, KERNEL_SIZE, config);
        orthogonal_(&mut conv.ws, leaky_relu_gain(LEAKY_RELU_SLOPE));
        conv
    }

    fn create_net(p: &nn::Path, n_stack: i64, num_filters: i64) -> nn::Sequential {
        nn::seq()
            .add(Self::conv(p / "c1", n_stack, num_filters))
            .add_fn(|xs| xs.leaky_relu())
            .add(Self::conv(p / "c2", num_filters, num_filters))
            .add_fn(|xs| xs.leaky_relu())
            .add(Self::conv(p / "c3", num_filters, num_filters))
            .add_fn(|xs| xs.leaky_relu())
            .add(Self::conv(p / "c4", num_filters, num_filters))
            .add_fn(|xs| xs.leaky_relu().avg_pool2d_default(2).flat_view())
    }

    /// Number of input channels.
    pub fn n_stack(&self) -> i64 {
        self.n_stack
    }

    pub(crate) fn set_device(&mut self, device: Device) {
        self.device = device;
    }
}

impl SubModel for ConvBlock {
    type Config = ConvBlockConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn build(p: &nn::Path, config: Self::Config) -> Result<Self, ModelError> {
        config.validate()?;
        trace!("Build ConvBlock with {:?}", config);

        Ok(Self {
            n_stack: config.n_stack,
            device: p.device(),
            seq: Self::create_net(p, config.n_stack, config.num_filters),
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor, ModelError> {
        let size = xs.size();
        if size.len() != 4 || size[1] != self.n_stack {
            return Err(ModelError::ShapeMismatch {
                what: "observations",
                expected: vec![-1, self.n_stack, -1, -1],
                actual: size,
            });
        }
        check_device("observations", self.device, xs)?;

        Ok(self.seq.forward(&xs.to_kind(Kind::Float)))
    }
}

//! Utilities.
use crate::error::ModelError;
use curio_core::record::{Record, RecordValue};
use tch::{nn, nn::VarStore, Device, Kind, Tensor};

/// Negative slope of the leaky ReLU used in the convolutional tower.
pub const LEAKY_RELU_SLOPE: f64 = 0.01;

/// Recommended gain of orthogonal initialization for a leaky ReLU with the given slope.
pub fn leaky_relu_gain(slope: f64) -> f64 {
    (2.0 / (1.0 + slope * slope)).sqrt()
}

/// Fills `ws` with a (semi-)orthogonal matrix scaled by `gain`.
///
/// Dimensions after the first are flattened, so this also applies to convolution kernels.
pub fn orthogonal_(ws: &mut Tensor, gain: f64) {
    let size = ws.size();
    let rows = size[0];
    let cols = size[1..].iter().product::<i64>();

    tch::no_grad(|| {
        let flat = Tensor::randn([rows.max(cols), rows.min(cols)], (Kind::Float, ws.device()));
        let (q, r) = Tensor::linalg_qr(&flat, "reduced");
        // Sign correction of the QR decomposition
        let q = q * r.diagonal(0, 0, 1).sign().unsqueeze(0);
        let q = if rows < cols { q.tr() } else { q };
        ws.copy_(&(q * gain).view(size.as_slice()));
    });
}

/// Linear layer with orthogonal weights and zero bias.
pub fn orthogonal_linear<'a, T>(path: T, in_dim: i64, out_dim: i64, gain: f64) -> nn::Linear
where
    T: std::borrow::Borrow<nn::Path<'a>>,
{
    let config = nn::LinearConfig {
        bs_init: Some(nn::Init::Const(0.)),
        ..Default::default()
    };
    let mut linear = nn::linear(path, in_dim, out_dim, config);
    orthogonal_(&mut linear.ws, gain);
    linear
}

/// Encodes integer actions as float one-hot rows of width `num_actions`.
pub fn one_hot(actions: &Tensor, num_actions: i64) -> Tensor {
    actions
        .to_kind(Kind::Int64)
        .view([-1])
        .one_hot(num_actions)
        .to_kind(Kind::Float)
}

/// Returns an error if `xs` does not live on `device`.
pub fn check_device(what: &'static str, device: Device, xs: &Tensor) -> Result<(), ModelError> {
    let actual = xs.device();
    if actual != device {
        return Err(ModelError::DeviceMismatch {
            what,
            expected: device,
            actual,
        });
    }
    Ok(())
}

/// Returns an error if the shape of `xs` differs from `expected`, where `-1` matches any size.
pub fn check_shape(what: &'static str, expected: &[i64], xs: &Tensor) -> Result<(), ModelError> {
    let actual = xs.size();
    let matches = actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected.iter())
            .all(|(&a, &e)| e == -1 || a == e);
    if !matches {
        return Err(ModelError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual,
        });
    }
    Ok(())
}

/// Joint L2 norm of the gradients of `vars`, skipping variables without a gradient.
pub fn grad_norm(vars: &[Tensor]) -> f64 {
    tch::no_grad(|| {
        vars.iter()
            .map(|v| v.grad())
            .filter(|g| g.defined())
            .map(|g| g.pow_tensor_scalar(2.0).sum(Kind::Double).double_value(&[]))
            .sum::<f64>()
            .sqrt()
    })
}

/// Scales the gradients of `vars` in place so that their joint L2 norm is at most `max`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm_(vars: &[Tensor], max: f64) -> f64 {
    let total = grad_norm(vars);
    let scale = max / (total + 1e-6);
    if scale < 1.0 {
        tch::no_grad(|| {
            for mut g in vars.iter().map(|v| v.grad()).filter(|g| g.defined()) {
                let _ = g.g_mul_scalar_(scale);
            }
        });
    }
    total
}

/// Returns the mean and standard deviation of the parameters.
pub fn param_stats(var_store: &VarStore) -> Record {
    let mut record = Record::empty();

    for (k, v) in var_store.variables() {
        let m = v.mean(Kind::Float).double_value(&[]) as f32;
        record.insert(format!("{}_mean", &k), RecordValue::Scalar(m));

        let s = v.std(false).double_value(&[]) as f32;
        record.insert(format!("{}_std", &k), RecordValue::Scalar(s));
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    #[test]
    fn test_one_hot_single_position() {
        let num_actions = 6;
        let actions = Tensor::from_slice(&[0i64, 1, 2, 3, 4, 5]);
        let encoded = one_hot(&actions, num_actions);
        assert_eq!(encoded.size(), vec![6, num_actions]);
        assert_eq!(encoded.kind(), Kind::Float);

        for i in 0..num_actions {
            for j in 0..num_actions {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(encoded.double_value(&[i, j]), expected);
            }
        }
    }

    #[test]
    fn test_orthogonal_rows() {
        tch::manual_seed(42);
        let vs = VarStore::new(Device::Cpu);
        let linear = orthogonal_linear(vs.root() / "l", 16, 8, 1.0);
        // [8, 16]: rows are orthonormal
        let gram = linear.ws.matmul(&linear.ws.tr());
        let eye = Tensor::eye(8, (Kind::Float, Device::Cpu));
        let diff = (gram - eye).abs().max().double_value(&[]);
        assert!(diff < 1e-4, "max deviation {}", diff);
        assert_eq!(linear.bs.as_ref().unwrap().abs().sum(Kind::Float).double_value(&[]), 0.0);
    }

    #[test]
    fn test_orthogonal_gain_conv_kernel() {
        tch::manual_seed(0);
        let mut ws = Tensor::zeros([32, 4, 3, 3], (Kind::Float, Device::Cpu));
        let gain = leaky_relu_gain(LEAKY_RELU_SLOPE);
        orthogonal_(&mut ws, gain);
        // [32, 36]: rows are orthogonal with norm `gain`
        let flat = ws.view([32, 36]);
        let gram = flat.matmul(&flat.tr());
        let expected = Tensor::eye(32, (Kind::Float, Device::Cpu)) * (gain * gain);
        let diff = (gram - expected).abs().max().double_value(&[]);
        assert!(diff < 1e-4, "max deviation {}", diff);
    }

    #[test]
    fn test_check_shape_wildcard() {
        let xs = Tensor::zeros([3, 5], (Kind::Float, Device::Cpu));
        assert!(check_shape("xs", &[-1, 5], &xs).is_ok());
        assert!(check_shape("xs", &[3, 4], &xs).is_err());
        assert!(check_shape("xs", &[3], &xs).is_err());
    }

    #[test]
    fn test_clip_grad_norm_spans_all_variables() {
        let vs1 = VarStore::new(Device::Cpu);
        let vs2 = VarStore::new(Device::Cpu);
        let a = vs1.root().ones("a", &[4]);
        let b = vs2.root().ones("b", &[9]);
        // Gradients 3 and 4 everywhere: norm sqrt(4 * 9 + 9 * 16) = sqrt(180)
        let loss = (&a * 3.0).sum(Kind::Float) + (&b * 4.0).sum(Kind::Float);
        loss.backward();

        let vars = vec![a.shallow_clone(), b.shallow_clone()];
        let before = clip_grad_norm_(&vars, 1.0);
        assert!((before - 180f64.sqrt()).abs() < 1e-4);
        assert!((grad_norm(&vars) - 1.0).abs() < 1e-4);

        // Relative size of the two gradients is kept
        let ratio = b.grad().double_value(&[0]) / a.grad().double_value(&[0]);
        assert!((ratio - 4.0 / 3.0).abs() < 1e-4);

        // Below the threshold nothing changes
        assert!((clip_grad_norm_(&vars, 10.0) - 1.0).abs() < 1e-4);
        assert!((grad_norm(&vars) - 1.0).abs() < 1e-4);
    }
}

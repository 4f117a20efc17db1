use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use tg_tensor::cast::cast;
use tg_tensor::{layout, Value};

use super::args::Args;
use crate::error::Result;
use crate::op::OpKind;

/// Draws a `shape`-shaped array from the distribution named by the tag.
///
/// A `seed` option gives the kernel its own generator; otherwise the
/// evaluator's shared generator is advanced.
pub(super) fn sample(args: &Args, shared: &mut StdRng) -> Result<Value> {
    let dims = match args.value("shape") {
        Some(shape) => shape
            .as_i64_vec()
            .map_err(|e| args.invalid("shape", &e.to_string()))?,
        None => vec![],
    };
    if dims.iter().any(|&d| d < 0) {
        return Err(args.invalid("shape", "extents must be non-negative"));
    }
    let count = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
        .ok_or_else(|| args.invalid("shape", "element count overflows"))?;

    let samples = match args.int("seed")? {
        Some(seed) => draw(args, &mut StdRng::seed_from_u64(seed as u64), count)?,
        None => draw(args, shared, count)?,
    };

    let integral = args.dtype.is_integer();
    let flat: Vec<Value> = samples
        .into_iter()
        .map(|x| {
            if integral {
                Value::Int(x.floor() as i64)
            } else {
                Value::Float(x)
            }
        })
        .collect();

    let shaped = if dims.is_empty() {
        flat.into_iter()
            .next()
            .ok_or_else(|| args.invalid("shape", "no samples drawn"))?
    } else {
        layout::reshape(&Value::Array(flat), &dims)?
    };
    Ok(cast(&shaped, args.dtype)?)
}

fn draw<R: Rng>(args: &Args, rng: &mut R, count: usize) -> Result<Vec<f64>> {
    match args.op {
        OpKind::RandomNormal => {
            let mean = args.float("mean", 0.0)?;
            let stddev = args.float("stddev", 1.0)?;
            if !(stddev.is_finite() && stddev >= 0.0) {
                return Err(args.invalid("stddev", "must be finite and non-negative"));
            }
            let normal =
                Normal::new(mean, stddev).map_err(|e| args.invalid("stddev", &e.to_string()))?;
            Ok(normal.sample_iter(rng).take(count).collect())
        }
        _ => {
            let low = args.float("minval", 0.0)?;
            let high = args.float("maxval", 1.0)?;
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(args.invalid("maxval", "must be greater than minval"));
            }
            let uniform = Uniform::new(low, high);
            Ok(uniform.sample_iter(rng).take(count).collect())
        }
    }
}

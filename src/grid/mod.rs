pub mod cursor;

use crate::linalg::vector::Vector;
use crate::{E, Error, I};

use self::cursor::CursorState;

/// Cap on the total number of grid samples a compact may carry.
pub const MAX_POINTS: u64 = u32::MAX as u64;

/// Divider applied to the per-axis increment when deciding whether a
/// coordinate sits on a sample.
const SAMPLING_PRECISION_DIVIDER: E = 1000.0;

/// Axis-aligned box `[begin, end]` in `R^n` with a uniform grid sampling.
///
/// Axis `i` carries `counters[i]` samples at `begin[i] + k * sampling[i]`
/// for `k < counters[i]`, where `sampling[i] = (end[i] - begin[i]) /
/// counters[i]`; the linear sample index is row-major with the last axis
/// fastest. Projection ([`Compact::nearest_neighbor`]) clamps into the box
/// and snaps to the closest sample, so its image is always addressable by
/// index.
///
/// The compact owns the traversal cursors it vends; see [`cursor`].
#[derive(Debug)]
pub struct Compact {
    dim: I,
    begin: Vector,
    end: Vector,
    /// Distance between neighboring samples, per axis. Zero on degenerate
    /// axes.
    sampling: Vector,
    counters: Vec<u32>,
    points: u64,
    pub(crate) cursors: Vec<Option<CursorState>>,
}

impl Compact {
    /// Builds a compact over `[begin, end]`.
    ///
    /// Without `step`, every axis gets `floor(MAX_POINTS^(1/n))` samples
    /// (degenerate axes get one). With `step`, each coordinate is rounded to
    /// a per-axis sample count, which must be at least one and whose product
    /// must not exceed [`MAX_POINTS`].
    pub fn new(begin: &Vector, end: &Vector, step: Option<&Vector>) -> Result<Self, Error> {
        if begin.dim() != end.dim() {
            tracing::warn!(
                begin = begin.dim(),
                end = end.dim(),
                "compact corners dimensions mismatch"
            );
            return Err(Error::DimensionsMismatch);
        }
        let dim = begin.dim();
        for i in 0..dim {
            if !(begin.get(i)? <= end.get(i)?) {
                tracing::warn!(axis = i, "compact lower corner exceeds upper corner");
                return Err(Error::WrongArg);
            }
        }

        let counters = match step {
            None => default_counters(begin, end)?,
            Some(step) => explicit_counters(dim, step)?,
        };

        let mut points: u64 = 1;
        let mut sampling = Vec::with_capacity(dim);
        for i in 0..dim {
            points *= u64::from(counters[i]);
            sampling.push((end.get(i)? - begin.get(i)?) / E::from(counters[i]));
        }

        Ok(Self {
            dim,
            begin: begin.clone(),
            end: end.clone(),
            sampling: Vector::new(&sampling)?,
            counters,
            points,
            cursors: Vec::new(),
        })
    }

    pub fn dim(&self) -> I {
        self.dim
    }

    /// Total number of grid samples.
    pub fn points_amount(&self) -> u64 {
        self.points
    }

    pub fn lower(&self) -> &Vector {
        &self.begin
    }

    pub fn upper(&self) -> &Vector {
        &self.end
    }

    /// Per-axis distance between neighboring samples.
    pub fn sampling(&self) -> &Vector {
        &self.sampling
    }

    pub fn counters(&self) -> &[u32] {
        &self.counters
    }

    /// Whether `vec` lies inside the box (boundary included).
    pub fn is_contains(&self, vec: &Vector) -> Result<bool, Error> {
        self.check_dim(vec)?;
        for i in 0..self.dim {
            let value = vec.get(i)?;
            if !(self.begin.get(i)? <= value && value <= self.end.get(i)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Projects `vec` onto the closest grid sample, clamping coordinates
    /// that fall outside the box.
    pub fn nearest_neighbor(&self, vec: &Vector) -> Result<Vector, Error> {
        self.check_dim(vec)?;
        let mut coords = Vec::with_capacity(self.dim);
        for i in 0..self.dim {
            let index = self.axis_snap(i, vec.get(i)?)?;
            coords.push(self.begin.get(i)? + E::from(index) * self.sampling.get(i)?);
        }
        Vector::new(&coords)
    }

    /// Whether `vec` coincides with a grid sample, up to
    /// `sampling / 1000` per axis.
    pub fn is_sampling_contains(&self, vec: &Vector) -> Result<bool, Error> {
        let neighbor = self.nearest_neighbor(vec)?;
        self.sample_equals(vec, &neighbor)
    }

    /// Linear index of the grid sample `vec`, which must coincide with a
    /// sample up to the sampling tolerance.
    pub fn index_of(&self, vec: &Vector) -> Result<u64, Error> {
        if !self.is_sampling_contains(vec)? {
            tracing::warn!("point is not a grid sample of the compact");
            return Err(Error::WrongArg);
        }
        let mut index: u64 = 0;
        for i in 0..self.dim {
            if i > 0 {
                index *= u64::from(self.counters[i]);
            }
            index += u64::from(self.axis_snap(i, vec.get(i)?)?);
        }
        Ok(index)
    }

    /// Grid sample at linear `index`.
    pub fn point_at(&self, index: u64) -> Result<Vector, Error> {
        if index >= self.points {
            tracing::warn!(index, points = self.points, "grid index out of range");
            return Err(Error::OutOfRange);
        }
        let mut coords = vec![0.0; self.dim];
        let mut rest = index;
        for i in (0..self.dim).rev() {
            let axis_index = rest % u64::from(self.counters[i]);
            rest /= u64::from(self.counters[i]);
            coords[i] = self.begin.get(i)? + E::from(axis_index as u32) * self.sampling.get(i)?;
        }
        Vector::new(&coords)
    }

    /// Historical surface; inclusion between compacts was never defined.
    pub fn is_sub_set(&self, _other: &Compact) -> Result<bool, Error> {
        tracing::warn!("Compact::is_sub_set is not implemented");
        Err(Error::NotImplemented)
    }

    /// Per-axis sample index closest to `value`, clamped into the grid.
    fn axis_snap(&self, axis: I, value: E) -> Result<u32, Error> {
        let begin = self.begin.get(axis)?;
        let sampling = self.sampling.get(axis)?;
        let last = self.counters[axis] - 1;
        if sampling == 0.0 || !(value > begin) {
            return Ok(0);
        }
        let snapped = ((value - begin) / sampling).round();
        if snapped >= E::from(last) {
            return Ok(last);
        }
        Ok(snapped as u32)
    }

    /// Coordinate-wise equality up to `sampling / 1000` per axis.
    fn sample_equals(&self, left: &Vector, right: &Vector) -> Result<bool, Error> {
        self.check_dim(left)?;
        self.check_dim(right)?;
        for i in 0..self.dim {
            let tolerance = self.sampling.get(i)?.abs() / SAMPLING_PRECISION_DIVIDER;
            if (left.get(i)? - right.get(i)?).abs() > tolerance {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_dim(&self, vec: &Vector) -> Result<(), Error> {
        if vec.dim() != self.dim {
            tracing::warn!(
                vec = vec.dim(),
                dim = self.dim,
                "compact and vector dimensions mismatch"
            );
            return Err(Error::DimensionsMismatch);
        }
        Ok(())
    }
}

impl Clone for Compact {
    /// Clones the box and its sampling; cursors stay with the original.
    fn clone(&self) -> Self {
        Self {
            dim: self.dim,
            begin: self.begin.clone(),
            end: self.end.clone(),
            sampling: self.sampling.clone(),
            counters: self.counters.clone(),
            points: self.points,
            cursors: Vec::new(),
        }
    }
}

fn default_counters(begin: &Vector, end: &Vector) -> Result<Vec<u32>, Error> {
    let dim = begin.dim();
    let per_axis = (MAX_POINTS as E).powf(1.0 / dim as E).floor() as u32;
    let per_axis = per_axis.max(1);
    let mut counters = Vec::with_capacity(dim);
    for i in 0..dim {
        if end.get(i)? == begin.get(i)? {
            counters.push(1);
        } else {
            counters.push(per_axis);
        }
    }
    Ok(counters)
}

fn explicit_counters(dim: I, step: &Vector) -> Result<Vec<u32>, Error> {
    if step.dim() != dim {
        tracing::warn!(
            step = step.dim(),
            dim,
            "sampling step dimensions mismatch"
        );
        return Err(Error::DimensionsMismatch);
    }
    let mut product: E = 1.0;
    let mut rounded = Vec::with_capacity(dim);
    for i in 0..dim {
        let counter = step.get(i)?.round();
        if !(counter >= 1.0) {
            tracing::warn!(axis = i, "per-axis sample count is below one");
            return Err(Error::WrongArg);
        }
        product *= counter;
        rounded.push(counter);
    }
    if product > MAX_POINTS as E {
        tracing::warn!(product, "sample count product exceeds the grid cap");
        return Err(Error::WrongArg);
    }
    Ok(rounded.into_iter().map(|counter| counter as u32).collect())
}

//! Sampled parameter spaces and their decomposition into shards.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use mt_types::{GridError, MtResult};
use serde::{Deserialize, Serialize};

/// A single axis of a structured grid, as requested by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDef {
    /// Axis name (e.g. "kappa").
    pub name: String,
    /// How the axis is sampled.
    pub kind: AxisKind,
}

/// Describes how an axis is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AxisKind {
    /// `count` evenly spaced points over [min, max], both ends included.
    Linear { min: f64, max: f64, count: usize },
    /// Explicit coordinates, used in the given order.
    Values { values: Vec<f64> },
}

impl AxisDef {
    fn resolve(&self) -> Result<Vec<f64>, GridError> {
        let values = match &self.kind {
            AxisKind::Linear { min, max, count } => {
                if *count == 0 {
                    return Err(GridError::EmptyAxis {
                        axis: self.name.clone(),
                    });
                }
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(GridError::InvalidBounds {
                        axis: self.name.clone(),
                        min: *min,
                        max: *max,
                    });
                }
                if *count == 1 {
                    vec![*min]
                } else {
                    (0..*count)
                        .map(|i| {
                            let t = i as f64 / (*count - 1) as f64;
                            min + t * (max - min)
                        })
                        .collect()
                }
            }
            AxisKind::Values { values } => {
                if values.is_empty() {
                    return Err(GridError::EmptyAxis {
                        axis: self.name.clone(),
                    });
                }
                values.clone()
            }
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err(GridError::NonFiniteCoordinate {
                axis: self.name.clone(),
            });
        }
        Ok(values)
    }
}

/// Builder for a structured (Cartesian product) grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub axes: Vec<AxisDef>,
}

impl GridSpec {
    pub fn new() -> Self {
        Self { axes: Vec::new() }
    }

    pub fn add_linear(mut self, name: impl Into<String>, min: f64, max: f64, count: usize) -> Self {
        self.axes.push(AxisDef {
            name: name.into(),
            kind: AxisKind::Linear { min, max, count },
        });
        self
    }

    pub fn add_values(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.axes.push(AxisDef {
            name: name.into(),
            kind: AxisKind::Values { values },
        });
        self
    }

    /// Axis pinned to a single value (e.g. v = 0 for double couples).
    pub fn add_fixed(self, name: impl Into<String>, value: f64) -> Self {
        self.add_values(name, vec![value])
    }

    /// Validate every axis and build the grid.
    pub fn build(&self) -> MtResult<ParameterGrid> {
        if self.axes.is_empty() {
            return Err(GridError::NoAxes.into());
        }
        check_names(self.axes.iter().map(|a| a.name.as_str()))?;

        let mut names = Vec::with_capacity(self.axes.len());
        let mut values = Vec::with_capacity(self.axes.len());
        for axis in &self.axes {
            names.push(axis.name.clone());
            values.push(axis.resolve()?);
        }

        // Row-major: the last axis varies fastest.
        let mut strides = vec![1usize; values.len()];
        for k in (0..values.len().saturating_sub(1)).rev() {
            strides[k] = strides[k + 1]
                .checked_mul(values[k + 1].len())
                .ok_or(GridError::SizeOverflow)?;
        }
        let len = strides[0]
            .checked_mul(values[0].len())
            .ok_or(GridError::SizeOverflow)?;

        Ok(ParameterGrid {
            storage: Arc::new(Storage::Structured {
                names,
                values,
                strides,
            }),
            offset: 0,
            len,
        })
    }
}

fn check_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), GridError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(GridError::DuplicateAxis {
                axis: name.to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Storage {
    Structured {
        names: Vec<String>,
        values: Vec<Vec<f64>>,
        strides: Vec<usize>,
    },
    Unstructured {
        names: Vec<String>,
        /// Row-major point table, `names.len()` coordinates per point.
        points: Vec<f64>,
    },
}

impl Storage {
    fn names(&self) -> &[String] {
        match self {
            Self::Structured { names, .. } | Self::Unstructured { names, .. } => names,
        }
    }

    fn point(&self, global: usize) -> Vec<f64> {
        match self {
            Self::Structured {
                values, strides, ..
            } => values
                .iter()
                .zip(strides)
                .map(|(axis, stride)| axis[(global / stride) % axis.len()])
                .collect(),
            Self::Unstructured { names, points } => {
                let ndim = names.len();
                points[global * ndim..(global + 1) * ndim].to_vec()
            }
        }
    }
}

/// A sampled parameter space, or a contiguous view into one.
///
/// Structured grids are the Cartesian product of their axes, unravelled in
/// row-major order (last axis fastest). Unstructured grids are an explicit
/// ordered point list. Either way `coordinate_at` is a fixed bijection from
/// `[0, len)` onto the points, and views produced by [`decompose`] share the
/// parent's storage while remembering their global offset.
///
/// [`decompose`]: ParameterGrid::decompose
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    storage: Arc<Storage>,
    offset: usize,
    len: usize,
}

impl PartialEq for ParameterGrid {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
            && self.len == other.len
            && (Arc::ptr_eq(&self.storage, &other.storage) || self.storage == other.storage)
    }
}

impl ParameterGrid {
    /// Build an unstructured grid from explicit points.
    pub fn unstructured(names: Vec<String>, points: Vec<Vec<f64>>) -> MtResult<Self> {
        if names.is_empty() {
            return Err(GridError::NoAxes.into());
        }
        if points.is_empty() {
            return Err(GridError::NoPoints.into());
        }
        check_names(names.iter().map(String::as_str))?;

        let ndim = names.len();
        let mut flat = Vec::with_capacity(points.len() * ndim);
        for (index, point) in points.iter().enumerate() {
            if point.len() != ndim {
                return Err(GridError::ArityMismatch {
                    index,
                    expected: ndim,
                    actual: point.len(),
                }
                .into());
            }
            if let Some(k) = point.iter().position(|v| !v.is_finite()) {
                return Err(GridError::NonFiniteCoordinate {
                    axis: names[k].clone(),
                }
                .into());
            }
            flat.extend_from_slice(point);
        }

        Ok(Self {
            len: points.len(),
            storage: Arc::new(Storage::Unstructured {
                names,
                points: flat,
            }),
            offset: 0,
        })
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_structured(&self) -> bool {
        matches!(*self.storage, Storage::Structured { .. })
    }

    /// Global index of this view's first point.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Global indices covered by this view.
    pub fn global_range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    pub fn axis_names(&self) -> &[String] {
        self.storage.names()
    }

    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axis_names().iter().position(|n| n == name)
    }

    /// Coordinate at index `i` of this view (`0 <= i < len`).
    pub fn coordinate_at(&self, i: usize) -> MtResult<Vec<f64>> {
        if i >= self.len {
            return Err(GridError::IndexOutOfRange {
                index: i,
                len: self.len,
            }
            .into());
        }
        Ok(self.storage.point(self.offset + i))
    }

    /// Named lookup into a coordinate returned by this grid.
    pub fn value(&self, name: &str, coordinate: &[f64]) -> MtResult<f64> {
        let k = self.axis_index(name).ok_or_else(|| GridError::UnknownAxis {
            axis: name.to_string(),
        })?;
        coordinate.get(k).copied().ok_or_else(|| {
            GridError::IndexOutOfRange {
                index: k,
                len: coordinate.len(),
            }
            .into()
        })
    }

    /// Points in order, paired with their global index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Vec<f64>)> + '_ {
        self.global_range()
            .map(move |global| (global, self.storage.point(global)))
    }

    /// Split into `n` contiguous views covering this grid exactly once.
    ///
    /// Every shard gets `len / n` points and the last one also takes the
    /// remainder, so with `n > len` the leading shards are empty.
    pub fn decompose(&self, n: usize) -> MtResult<Vec<ParameterGrid>> {
        if n == 0 {
            return Err(GridError::InvalidShardCount { shards: n }.into());
        }
        if n == 1 {
            return Ok(vec![self.clone()]);
        }

        let base = self.len / n;
        let remainder = self.len % n;
        let shards = (0..n)
            .map(|s| {
                let extra = if s == n - 1 { remainder } else { 0 };
                ParameterGrid {
                    storage: Arc::clone(&self.storage),
                    offset: self.offset + s * base,
                    len: base + extra,
                }
            })
            .collect();
        Ok(shards)
    }
}

/// Splits source grids for distribution across workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridDecomposer;

impl GridDecomposer {
    pub fn split(grid: &ParameterGrid, n: usize) -> MtResult<Vec<ParameterGrid>> {
        grid.decompose(n)
    }
}

//! Misfit values over the origin × source space.

use std::ops::Range;

use mt_types::{GridError, MtResult, SearchError};
use serde::{Deserialize, Serialize};

/// Misfit for every (origin, source) pair of a search, or of one shard.
///
/// Values are stored source-major, `(source - source_offset) * n_origins +
/// origin`, so the surfaces of contiguous source shards concatenate into
/// the surface of the undivided grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MisfitSurface {
    n_origins: usize,
    source_offset: usize,
    n_sources: usize,
    values: Vec<f64>,
}

/// Location and value of a minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestFit {
    pub origin_index: usize,
    pub source_index: usize,
    pub misfit: f64,
}

impl MisfitSurface {
    pub(crate) fn from_values(n_origins: usize, source_offset: usize, values: Vec<f64>) -> Self {
        let n_sources = if n_origins == 0 {
            0
        } else {
            values.len() / n_origins
        };
        Self {
            n_origins,
            source_offset,
            n_sources,
            values,
        }
    }

    /// Reassemble the full surface from shard surfaces, in any order.
    ///
    /// The shards must share their origin count and tile a contiguous range
    /// of source indices without gaps or overlaps.
    pub fn merge(mut parts: Vec<MisfitSurface>) -> MtResult<Self> {
        let n_origins = match parts.first() {
            Some(p) => p.n_origins,
            None => {
                return Err(SearchError::IncompleteCoverage {
                    message: "no partial surfaces".to_string(),
                }
                .into())
            }
        };
        if let Some(p) = parts.iter().find(|p| p.n_origins != n_origins) {
            return Err(SearchError::IncompleteCoverage {
                message: format!("origin count {} differs from {}", p.n_origins, n_origins),
            }
            .into());
        }

        // Stable sort keeps empty shards ahead of the non-empty shard sharing their offset.
        parts.sort_by_key(|p| p.source_offset);
        let source_offset = parts[0].source_offset;
        let mut next = source_offset;
        let mut values = Vec::with_capacity(parts.iter().map(|p| p.values.len()).sum());
        for part in parts {
            if part.source_offset != next {
                return Err(SearchError::IncompleteCoverage {
                    message: format!("expected shard at {next}, found {}", part.source_offset),
                }
                .into());
            }
            next += part.n_sources;
            values.extend(part.values);
        }

        Ok(Self {
            n_origins,
            source_offset,
            n_sources: next - source_offset,
            values,
        })
    }

    pub fn n_origins(&self) -> usize {
        self.n_origins
    }

    pub fn n_sources(&self) -> usize {
        self.n_sources
    }

    /// Global source indices covered.
    pub fn source_range(&self) -> Range<usize> {
        self.source_offset..self.source_offset + self.n_sources
    }

    /// Raw values in storage order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Misfit at `origin` and global source index `source`.
    pub fn get(&self, origin: usize, source: usize) -> MtResult<f64> {
        if origin >= self.n_origins {
            return Err(GridError::IndexOutOfRange {
                index: origin,
                len: self.n_origins,
            }
            .into());
        }
        if !self.source_range().contains(&source) {
            return Err(GridError::IndexOutOfRange {
                index: source,
                len: self.source_range().end,
            }
            .into());
        }
        Ok(self.values[(source - self.source_offset) * self.n_origins + origin])
    }

    /// Misfit of every source at one origin, in source order.
    pub fn origin_values(&self, origin: usize) -> MtResult<Vec<f64>> {
        if origin >= self.n_origins {
            return Err(GridError::IndexOutOfRange {
                index: origin,
                len: self.n_origins,
            }
            .into());
        }
        Ok(self
            .values
            .iter()
            .skip(origin)
            .step_by(self.n_origins)
            .copied()
            .collect())
    }

    /// Global minimum; ties resolve to the lowest storage index.
    pub fn best(&self) -> Option<BestFit> {
        let (k, &misfit) = self
            .values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        Some(BestFit {
            origin_index: k % self.n_origins,
            source_index: self.source_offset + k / self.n_origins,
            misfit,
        })
    }

    /// Best source for a single origin.
    pub fn best_for_origin(&self, origin: usize) -> MtResult<Option<BestFit>> {
        let column = self.origin_values(origin)?;
        Ok(column
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &misfit)| BestFit {
                origin_index: origin,
                source_index: self.source_offset + i,
                misfit,
            }))
    }

    pub fn min(&self) -> Option<f64> {
        self.best().map(|b| b.misfit)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().max_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_types::{ErrorKind, MtError};

    /// 2 origins x 3 sources, misfit = 10 * source + origin.
    fn sample_surface(offset: usize) -> MisfitSurface {
        let values = (0..3)
            .flat_map(|s| (0..2).map(move |o| (10 * (s + offset) + o) as f64))
            .collect();
        MisfitSurface::from_values(2, offset, values)
    }

    #[test]
    fn indexing_by_origin_and_global_source() {
        let surface = sample_surface(4);
        assert_eq!(surface.n_sources(), 3);
        assert_eq!(surface.source_range(), 4..7);
        assert_eq!(surface.get(1, 5).unwrap(), 51.0);
        assert_eq!(surface.origin_values(0).unwrap(), vec![40.0, 50.0, 60.0]);

        let err = surface.get(0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Index);
        assert!(surface.get(2, 4).is_err());
        assert!(surface.origin_values(2).is_err());
    }

    #[test]
    fn best_fit_and_extremes() {
        let surface = MisfitSurface::from_values(2, 0, vec![3.0, 2.0, 1.0, 5.0, 1.0, 0.5]);
        let best = surface.best().unwrap();
        assert_eq!(best.origin_index, 1);
        assert_eq!(best.source_index, 2);
        assert_eq!(best.misfit, 0.5);
        assert_eq!(surface.max(), Some(5.0));
        assert_eq!(surface.min(), Some(0.5));

        let per_origin = surface.best_for_origin(0).unwrap().unwrap();
        assert_eq!(per_origin.source_index, 1); // tie with source 2 resolves low
        assert_eq!(per_origin.misfit, 1.0);
    }

    #[test]
    fn empty_surface_has_no_best() {
        let surface = MisfitSurface::from_values(2, 7, vec![]);
        assert!(surface.is_empty());
        assert_eq!(surface.best(), None);
        assert_eq!(surface.source_range(), 7..7);
    }

    #[test]
    fn merge_restores_grid_order() {
        let whole = MisfitSurface::from_values(
            2,
            0,
            (0..9)
                .flat_map(|s| (0..2).map(move |o| (10 * s + o) as f64))
                .collect(),
        );
        let parts = vec![
            sample_surface(6),
            MisfitSurface::from_values(2, 0, vec![]),
            sample_surface(0),
            sample_surface(3),
        ];
        let merged = MisfitSurface::merge(parts).unwrap();
        assert_eq!(merged, whole);
    }

    #[test]
    fn merge_rejects_gaps_and_mismatches() {
        let err = MisfitSurface::merge(vec![sample_surface(0), sample_surface(4)]).unwrap_err();
        assert!(matches!(
            err,
            MtError::Search(SearchError::IncompleteCoverage { .. })
        ));

        let odd = MisfitSurface::from_values(3, 3, vec![0.0; 3]);
        assert!(MisfitSurface::merge(vec![sample_surface(0), odd]).is_err());
        assert!(MisfitSurface::merge(vec![]).is_err());
    }

    #[test]
    fn surface_serialization() {
        let surface = sample_surface(0);
        let json = serde_json::to_string(&surface).unwrap();
        let back: MisfitSurface = serde_json::from_str(&json).unwrap();
        assert_eq!(surface, back);
    }
}

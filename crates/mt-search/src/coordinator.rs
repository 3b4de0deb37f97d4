//! Splits a grid search across workers and reassembles the result.

use std::thread;

use mt_grid::{GridDecomposer, ParameterGrid};
use mt_types::{CommError, MtResult, Origin, SearchError};
use tracing::{debug, info, warn};

use crate::comm::{ChannelCommunicator, Communicator, SerialCommunicator};
use crate::config::{ExecutionMode, SearchConfig};
use crate::driver::GridSearchDriver;
use crate::misfit::{MisfitCategory, MisfitEvaluator};
use crate::surface::MisfitSurface;

/// Runs one grid search as a member of a worker group.
///
/// On an active group the root decomposes the source grid into one
/// contiguous shard per rank, every rank searches its shard, and the root
/// merges the partial surfaces back into grid order. The merged surface is
/// identical to what a serial search over the whole grid produces.
pub struct DistributedCoordinator<C: Communicator> {
    comm: C,
}

impl<C: Communicator> DistributedCoordinator<C> {
    pub fn new(comm: C) -> Self {
        Self { comm }
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn size(&self) -> usize {
        self.comm.size()
    }

    /// More than one worker takes part.
    pub fn is_active(&self) -> bool {
        self.comm.size() > 1
    }

    /// Search `sources` at every origin.
    ///
    /// Returns the merged surface on the root and `None` on other ranks.
    /// Only the root's `sources` is read on an active group. A failure on
    /// any rank fails the search on the root; the lowest failing rank wins.
    pub fn run<E: MisfitEvaluator>(
        &self,
        categories: &[MisfitCategory<E>],
        origins: &[Origin],
        sources: &ParameterGrid,
        config: &SearchConfig,
    ) -> MtResult<Option<MisfitSurface>> {
        if !self.is_active() {
            let mut driver = GridSearchDriver::new(categories, config.clone())?;
            return driver.run(origins, sources).map(Some);
        }

        let shards = if self.comm.is_root() {
            let shards = GridDecomposer::split(sources, self.comm.size())?;
            info!(
                "Distributing {} sources across {} workers",
                sources.len(),
                shards.len()
            );
            Some(shards)
        } else {
            None
        };
        let shard: ParameterGrid = self.comm.scatter(shards)?;

        let config = if self.comm.is_root() {
            config.clone()
        } else {
            config.clone().with_verbose(false)
        };
        let result = GridSearchDriver::new(categories, config)
            .and_then(|mut driver| driver.run(origins, &shard));
        debug!(
            rank = self.rank(),
            sources = shard.len(),
            ok = result.is_ok(),
            "Shard search finished"
        );

        match self.comm.gather(result)? {
            Some(results) => {
                if let Some((rank, err)) = results
                    .iter()
                    .enumerate()
                    .find_map(|(rank, r)| r.as_ref().err().map(|e| (rank, e)))
                {
                    warn!("Grid search failed on rank {}: {}", rank, err);
                }
                let parts = results.into_iter().collect::<MtResult<Vec<_>>>()?;
                MisfitSurface::merge(parts).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Grid search in the execution mode named by the environment.
pub fn grid_search<E: MisfitEvaluator>(
    categories: &[MisfitCategory<E>],
    origins: &[Origin],
    sources: &ParameterGrid,
    config: &SearchConfig,
) -> MtResult<MisfitSurface> {
    grid_search_with_mode(ExecutionMode::from_env(), categories, origins, sources, config)
}

/// Grid search with an explicit execution mode.
///
/// Distributed mode runs one worker per thread; workers share only the
/// read-only inputs and exchange shards and results over channels. A worker
/// that panics is reported as a communication error. Under `panic = "abort"`
/// the process aborts first.
pub fn grid_search_with_mode<E: MisfitEvaluator>(
    mode: ExecutionMode,
    categories: &[MisfitCategory<E>],
    origins: &[Origin],
    sources: &ParameterGrid,
    config: &SearchConfig,
) -> MtResult<MisfitSurface> {
    let result = if mode.workers() <= 1 {
        DistributedCoordinator::new(SerialCommunicator).run(categories, origins, sources, config)
    } else {
        let mut group = ChannelCommunicator::group(mode.workers())?;
        let root = group.remove(0);

        thread::scope(|scope| {
            let handles: Vec<_> = group
                .into_iter()
                .map(|comm| {
                    scope.spawn(move || {
                        DistributedCoordinator::new(comm).run(categories, origins, sources, config)
                    })
                })
                .collect();

            // The root's endpoint drops with this statement, releasing any
            // worker still waiting on it.
            let mut result =
                DistributedCoordinator::new(root).run(categories, origins, sources, config);

            for (i, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    let rank = i + 1;
                    warn!("Worker {} panicked", rank);
                    if result.is_ok() {
                        result = Err(CommError::Disconnected { rank }.into());
                    }
                }
            }
            result
        })
    };

    result?.ok_or_else(|| {
        SearchError::IncompleteCoverage {
            message: "root received no surface".to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        origins, small_source_grid, tensors_at, FailingEvaluator, FixedMisfit, ReferenceMisfit,
        PanicOnSources, RejectSources, RejectedSource,
    };
    use mt_grid::double_couple_grid_random;
    use mt_types::{ErrorKind, MomentTensor, MtError};

    fn reference_categories() -> Vec<MisfitCategory<ReferenceMisfit>> {
        vec![
            MisfitCategory::new(
                "body_waves",
                ReferenceMisfit,
                MomentTensor::new([1.0, -1.0, 0.0, 0.2, 0.0, 0.5]),
                2.0,
            )
            .with_time_shift(-2.0, 2.0),
            MisfitCategory::new(
                "surface_waves",
                ReferenceMisfit,
                MomentTensor::new([0.0, 0.0, 0.0, 1.0, -0.3, 0.0]),
                1.0,
            ),
        ]
    }

    fn quiet() -> SearchConfig {
        SearchConfig::new().with_verbose(false)
    }

    #[test]
    fn distributed_matches_serial() {
        let categories = reference_categories();
        let origins = origins(2);
        let sources = small_source_grid();

        let serial =
            grid_search_with_mode(ExecutionMode::Serial, &categories, &origins, &sources, &quiet())
                .unwrap();
        assert_eq!(serial.n_sources(), 18);

        for workers in [2, 4, 7, 25] {
            let distributed = grid_search_with_mode(
                ExecutionMode::Distributed { workers },
                &categories,
                &origins,
                &sources,
                &quiet(),
            )
            .unwrap();
            assert_eq!(distributed, serial, "workers = {workers}");
        }
    }

    #[test]
    fn distributed_unstructured_grid() {
        let categories = reference_categories();
        let origins = origins(1);
        let sources = double_couple_grid_random(50, &[4.0, 4.5], 17).unwrap();

        let serial =
            grid_search_with_mode(ExecutionMode::Serial, &categories, &origins, &sources, &quiet())
                .unwrap();
        let distributed = grid_search_with_mode(
            ExecutionMode::Distributed { workers: 3 },
            &categories,
            &origins,
            &sources,
            &quiet(),
        )
        .unwrap();

        assert_eq!(distributed, serial);
        assert_eq!(distributed.best(), serial.best());
    }

    #[test]
    fn worker_failure_fails_the_search() {
        let categories = vec![MisfitCategory::new("body_waves", FailingEvaluator, (), ())];
        let err = grid_search_with_mode(
            ExecutionMode::Distributed { workers: 3 },
            &categories,
            &origins(1),
            &small_source_grid(),
            &quiet(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Evaluator);
        assert_eq!(err.to_string(), FailingEvaluator::MESSAGE);
    }

    fn rejecting(sources: &ParameterGrid, indices: &[usize]) -> Vec<MisfitCategory<RejectSources>> {
        vec![MisfitCategory::new(
            "body_waves",
            RejectSources,
            tensors_at(sources, indices),
            (),
        )]
    }

    fn serial_and_three_workers(
        categories: &[MisfitCategory<RejectSources>],
        sources: &ParameterGrid,
    ) -> (MtResult<MisfitSurface>, MtResult<MisfitSurface>) {
        let serial =
            grid_search_with_mode(ExecutionMode::Serial, categories, &origins(1), sources, &quiet());
        let distributed = grid_search_with_mode(
            ExecutionMode::Distributed { workers: 3 },
            categories,
            &origins(1),
            sources,
            &quiet(),
        );
        (serial, distributed)
    }

    #[test]
    fn failure_on_a_single_shard_reaches_the_root() {
        // Shards of 3 workers over 18 sources: [0, 6), [6, 12), [12, 18).
        let sources = small_source_grid();
        let categories = rejecting(&sources, &[13, 15]);
        let (serial, distributed) = serial_and_three_workers(&categories, &sources);

        let serial = serial.unwrap_err();
        let distributed = distributed.unwrap_err();
        assert_eq!(distributed.kind(), ErrorKind::Evaluator);
        assert_eq!(distributed.to_string(), "source 0 rejected");
        assert_eq!(distributed.to_string(), serial.to_string());
        match distributed {
            MtError::Evaluator(inner) => {
                assert_eq!(inner.downcast_ref::<RejectedSource>().unwrap().index, 0)
            }
            other => panic!("Expected evaluator error, got {other:?}"),
        }
    }

    #[test]
    fn lowest_failing_rank_wins() {
        // Rank 2 rejects source 14 (list position 0), rank 1 rejects 8 (position 1).
        let sources = small_source_grid();
        let categories = rejecting(&sources, &[14, 8]);
        let (serial, distributed) = serial_and_three_workers(&categories, &sources);

        let serial = serial.unwrap_err();
        let distributed = distributed.unwrap_err();
        assert_eq!(distributed.to_string(), "source 1 rejected");
        assert_eq!(distributed.to_string(), serial.to_string());
    }

    #[test]
    fn rejecting_nothing_succeeds_everywhere() {
        let sources = small_source_grid();
        let categories = rejecting(&sources, &[]);
        let (serial, distributed) = serial_and_three_workers(&categories, &sources);
        assert_eq!(distributed.unwrap(), serial.unwrap());
    }

    #[test]
    fn panicking_worker_becomes_a_communication_error() {
        let sources = small_source_grid();
        let categories = vec![MisfitCategory::new(
            "body_waves",
            PanicOnSources,
            tensors_at(&sources, &[8]),
            (),
        )];
        let err = grid_search_with_mode(
            ExecutionMode::Distributed { workers: 3 },
            &categories,
            &origins(1),
            &sources,
            &quiet(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Communication);
        assert!(matches!(err, MtError::Comm(CommError::Disconnected { rank: 1 })));
    }

    #[test]
    fn configuration_errors_surface_from_every_mode() {
        let categories = vec![MisfitCategory::new("body_waves", FixedMisfit, 1.0, ())];
        let config = quiet().with_weights(vec![1.0, 1.0]);
        for mode in [ExecutionMode::Serial, ExecutionMode::Distributed { workers: 2 }] {
            let err = grid_search_with_mode(
                mode,
                &categories,
                &origins(1),
                &small_source_grid(),
                &config,
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn serial_group_is_inactive() {
        let coordinator = DistributedCoordinator::new(SerialCommunicator);
        assert!(!coordinator.is_active());
        assert_eq!(coordinator.size(), 1);

        let categories = vec![MisfitCategory::new("body_waves", FixedMisfit, 2.5, ())];
        let surface = coordinator
            .run(&categories, &origins(3), &small_source_grid(), &quiet())
            .unwrap()
            .unwrap();
        assert_eq!(surface.n_origins(), 3);
        assert!(surface.values().iter().all(|&v| v == 2.5));
    }

    #[test]
    fn grid_search_probes_execution_mode() {
        let categories = vec![MisfitCategory::new("body_waves", FixedMisfit, 1.0, ())];
        let surface = grid_search(&categories, &origins(1), &small_source_grid(), &quiet()).unwrap();
        assert_eq!(surface.n_sources(), 18);
    }
}

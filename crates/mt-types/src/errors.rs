use thiserror::Error;

/// Boxed error returned by injected collaborators (misfit evaluators).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for grid-search inversion
#[derive(Error, Debug)]
pub enum MtError {
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Communication error: {0}")]
    Comm(#[from] CommError),

    /// Failure raised by a misfit evaluator, passed through untouched.
    #[error(transparent)]
    Evaluator(BoxError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors from constructing or indexing parameter grids
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Axis {axis} has no points")]
    EmptyAxis { axis: String },

    #[error("Axis {axis} has invalid bounds [{min}, {max}]")]
    InvalidBounds { axis: String, min: f64, max: f64 },

    #[error("Axis {axis} contains a non-finite coordinate")]
    NonFiniteCoordinate { axis: String },

    #[error("Duplicate axis name: {axis}")]
    DuplicateAxis { axis: String },

    #[error("Grid has no axes")]
    NoAxes,

    #[error("Unstructured grid has no points")]
    NoPoints,

    #[error("Point {index} has {actual} coordinates, expected {expected}")]
    ArityMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Grid size overflows usize")]
    SizeOverflow,

    #[error("Index {index} out of range for grid of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot decompose grid into {shards} shards")]
    InvalidShardCount { shards: usize },

    #[error("Grid has no axis named {axis}")]
    UnknownAxis { axis: String },
}

/// Errors from the lune-to-tensor parameterization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Source-type parameter v = {v} violates |3v| <= 1")]
    SourceTypeOutOfRange { v: f64 },

    #[error("Source-type parameter w = {w} violates |w| <= 3pi/8")]
    LuneLatitudeOutOfRange { w: f64 },

    #[error("Dip parameter h = {h} outside [0, 1]")]
    DipOutOfRange { h: f64 },

    #[error("Scalar moment rho = {rho} must be finite and non-negative")]
    InvalidMoment { rho: f64 },

    #[error("Parameter {name} is not finite")]
    NonFinite { name: String },

    #[error("Interpolation table needs at least 2 samples, got {samples}")]
    InvalidResolution { samples: usize },
}

/// Errors from the search driver and result assembly
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("No misfit categories configured")]
    NoCategories,

    #[error("Got {weights} weights for {categories} misfit categories")]
    WeightCountMismatch { weights: usize, categories: usize },

    #[error("Weight for category {category} is invalid: {weight}")]
    InvalidWeight { category: String, weight: f64 },

    #[error("Category weights must sum to a positive total, got {total}")]
    ZeroWeightTotal { total: f64 },

    #[error("Category {category} returned invalid misfit {value}")]
    InvalidMisfit { category: String, value: f64 },

    #[error("No origins supplied")]
    NoOrigins,

    #[error("Partial surfaces do not tile the source grid: {message}")]
    IncompleteCoverage { message: String },

    #[error("Search has already run")]
    AlreadyRun,
}

/// Errors from scatter/gather between workers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommError {
    #[error("Worker {rank} disconnected")]
    Disconnected { rank: usize },

    #[error("Scatter on root needs exactly {expected} items, got {actual}")]
    ScatterCount { expected: usize, actual: usize },

    #[error("Root did not provide items to scatter")]
    MissingScatterItems,

    #[error("Rank {rank} received a message of unexpected type")]
    UnexpectedMessage { rank: usize },
}

/// Coarse classification of an [`MtError`], matching how callers react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad construction input; raised before any evaluation.
    Configuration,
    /// A parameter value outside its mathematically valid range.
    Domain,
    /// A grid index outside `[0, len)`.
    Index,
    /// Propagated unchanged from the misfit evaluator.
    Evaluator,
    /// Worker scatter/gather failure.
    Communication,
}

impl MtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Grid(GridError::IndexOutOfRange { .. }) => ErrorKind::Index,
            Self::Grid(_) | Self::Config(_) => ErrorKind::Configuration,
            Self::Parameter(ParameterError::InvalidResolution { .. }) => ErrorKind::Configuration,
            Self::Parameter(_) => ErrorKind::Domain,
            Self::Search(SearchError::InvalidMisfit { .. }) => ErrorKind::Domain,
            Self::Search(SearchError::IncompleteCoverage { .. }) => ErrorKind::Communication,
            Self::Search(_) => ErrorKind::Configuration,
            Self::Comm(_) => ErrorKind::Communication,
            Self::Evaluator(_) => ErrorKind::Evaluator,
        }
    }
}

/// Result type alias for grid-search operations
pub type MtResult<T> = Result<T, MtError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::MtError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "station ANMO missing")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_error_display() {
        let error = GridError::IndexOutOfRange { index: 12, len: 10 };
        assert!(error.to_string().contains("12"));
        assert!(error.to_string().contains("10"));

        let error = ParameterError::SourceTypeOutOfRange { v: 0.4 };
        assert!(error.to_string().contains("0.4"));
    }

    #[test]
    fn test_error_conversion() {
        let mt_error: MtError = GridError::EmptyAxis { axis: "h".into() }.into();
        assert!(matches!(mt_error, MtError::Grid(GridError::EmptyAxis { .. })));
        assert_eq!(mt_error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_error_kinds() {
        let index: MtError = GridError::IndexOutOfRange { index: 3, len: 3 }.into();
        assert_eq!(index.kind(), ErrorKind::Index);

        let domain: MtError = ParameterError::SourceTypeOutOfRange { v: 0.4 }.into();
        assert_eq!(domain.kind(), ErrorKind::Domain);

        let latitude: MtError = ParameterError::LuneLatitudeOutOfRange { w: 1.3 }.into();
        assert_eq!(latitude.kind(), ErrorKind::Domain);
        assert!(latitude.to_string().contains("1.3"));

        let config = config_error!("bad weights");
        assert_eq!(config.kind(), ErrorKind::Configuration);

        let resolution: MtError = ParameterError::InvalidResolution { samples: 1 }.into();
        assert_eq!(resolution.kind(), ErrorKind::Configuration);

        let comm: MtError = CommError::Disconnected { rank: 2 }.into();
        assert_eq!(comm.kind(), ErrorKind::Communication);
    }

    #[test]
    fn test_evaluator_error_is_transparent() {
        let err = MtError::Evaluator(Box::new(Boom));
        assert_eq!(err.to_string(), "station ANMO missing");
        assert_eq!(err.kind(), ErrorKind::Evaluator);

        match err {
            MtError::Evaluator(inner) => assert!(inner.downcast_ref::<Boom>().is_some()),
            other => panic!("Expected evaluator error, got {other:?}"),
        }
    }

    #[test]
    fn test_macros() {
        let err = config_error!("Missing axis: {}", "kappa");
        assert_eq!(err.to_string(), "Configuration error: Missing axis: kappa");
    }
}

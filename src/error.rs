use core::fmt;

/// Result alias for `cobin`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by distance, hierarchy and binning primitives.
///
/// Every variant is fatal to the current run: they indicate caller misuse or a
/// corrupted cache rather than a transient failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid or missing configuration (e.g. neither `min_size` nor `min_pts`).
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// A cached array was computed for a different number of observations.
    StaleCache {
        /// Name of the cached array.
        kind: &'static str,
        /// Observation count of the current run.
        expected: usize,
        /// Observation count implied by the cached array.
        found: usize,
    },

    /// Per-contig or per-node arrays disagree in length.
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Found length.
        found: usize,
    },

    /// A condensed array length that is not `n * (n - 1) / 2` for any `n`.
    InvalidCondensedLength {
        /// Offending length.
        len: usize,
    },

    /// A malformed linkage row.
    InvalidLinkage {
        /// Row index.
        row: usize,
        /// Error message.
        message: String,
    },

    /// A node id outside the dendrogram.
    InvalidNode {
        /// Offending node id.
        node: usize,
        /// Number of nodes in the dendrogram.
        n_nodes: usize,
    },

    /// Cache storage failure.
    Cache {
        /// Error message.
        message: String,
    },

    /// Generic error with message.
    Other(String),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration { message } => write!(f, "configuration error: {message}"),
            Error::StaleCache {
                kind,
                expected,
                found,
            } => write!(
                f,
                "saved {kind} are for {found} observations, expected {expected}"
            ),
            Error::DimensionMismatch {
                what,
                expected,
                found,
            } => {
                write!(f, "dimension mismatch in {what}: expected {expected}, found {found}")
            }
            Error::InvalidCondensedLength { len } => {
                write!(f, "{len} is not a valid condensed distance array length")
            }
            Error::InvalidLinkage { row, message } => {
                write!(f, "invalid linkage row {row}: {message}")
            }
            Error::InvalidNode { node, n_nodes } => {
                write!(f, "node {node} is not in a dendrogram of {n_nodes} nodes")
            }
            Error::Cache { message } => write!(f, "distance cache: {message}"),
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

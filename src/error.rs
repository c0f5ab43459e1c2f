use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BvhError {
    /// A stored index does not address the positions slice handed to the query.
    #[error("point index {index} is out of range for {len} positions")]
    IndexOutOfRange { index: usize, len: usize },
    /// The positions slice is shorter than the snapshot the tree was built from.
    #[error("tree was built over {expected} positions, but only {actual} were supplied")]
    PositionsTooShort { expected: usize, actual: usize },
}

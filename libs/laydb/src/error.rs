//! Layout database error types.

use arcstr::ArcStr;

use crate::layer::Layer;
use crate::CellId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error produced by a rejected layout mutation or query.
///
/// A returned error always means no state was changed.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cell {0:?} does not exist in this layout")]
    UnknownCell(CellId),
    #[error("a cell named `{0}` already exists")]
    CellNameTaken(ArcStr),
    #[error("no cell named `{0}`")]
    CellNotFound(ArcStr),
    #[error("layer {0} does not exist in the cell")]
    UnknownLayer(Layer),
    #[error("shape handle does not refer to a shape of this cell")]
    ForeignShape,
    #[error("instance handle does not refer to an instance of this cell")]
    ForeignInstance,
    #[error("instancing {child:?} in {parent:?} would create a cycle")]
    InstanceCycle { parent: CellId, child: CellId },
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

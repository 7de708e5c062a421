//! Phylogenetic tree structures: arena storage, Newick I/O, and the
//! postorder id index the distance kernels run on.

pub mod arena;
pub mod index;
pub mod newick;

pub use arena::Tree;
pub use index::{IndexedTree, NodeId};
pub use newick::{parse_newick, read_newick_file, write_newick};

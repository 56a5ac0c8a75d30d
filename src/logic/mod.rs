pub mod debounce;
pub mod normalize;
pub mod pagination;
pub mod reader;
pub mod writer;

pub use debounce::Debouncer;
pub use normalize::*;
pub use pagination::*;
pub use reader::CollectionReader;
pub use writer::{CollectionWriter, MutationState};

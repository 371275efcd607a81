// crates/core/src/lib.rs
pub mod archive;
pub mod compile;
pub mod error;
pub mod library;
pub mod normalize;
pub mod pack;
pub mod progress;
pub mod types;
pub mod unpack;

pub use compile::{published_name, CompileRequest, CompileSettings, Compiler};
pub use error::*;
pub use library::{published_comics, Library, LibraryComic};
pub use progress::{CompileObserver, NoopObserver};
pub use types::*;

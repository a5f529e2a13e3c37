pub mod filter;
pub mod render;
pub mod shell;
pub mod sink;

pub use filter::Filter;
pub use render::{ActionRenderer, Macro};
pub use sink::{ActionSink, CollectingSink, DispatchError, DispatchMode, WriterSink};

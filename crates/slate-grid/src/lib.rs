pub mod alteration;
pub mod column;
pub mod error;
pub mod events;
pub mod export;
pub mod filter;
pub mod grid;
pub mod memory;
pub mod merge;
pub mod path;
pub mod project;
pub mod qs;
pub mod query;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod state;
pub mod update;
pub mod value;

pub use alteration::{AlterationStore, GridRecord, MemoryAlterationStore};
pub use column::{Column, ColumnSort};
pub use error::GridError;
pub use events::{Emitter, Subscription};
pub use export::{ExportFile, ExportOutcome, ExportRegistry, ExportTable, Exporter};
pub use filter::FilterDef;
pub use grid::Grid;
pub use memory::MemoryCollection;
pub use merge::merge;
pub use query::{GridQuery, GridRow};
pub use registry::{Descriptor, OrderContext, Registry};
pub use request::RequestContext;
pub use resolver::{Resolution, SortState};
pub use response::{ColumnMeta, FilterMeta};
pub use state::StateStore;

pub use slate_query::{FilterNode, Operator};

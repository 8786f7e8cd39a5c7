pub mod config;
pub mod http;

pub use config::{ColumnConfig, ColumnFormat, FilterConfig, GridConfig, SortConfig};
pub use http::{GridHttp, SESSION_HEADER, VIEWER_HEADER};

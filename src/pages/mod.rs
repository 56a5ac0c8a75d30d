pub mod catalog;
pub mod toast;
pub mod view;

pub use catalog::{page, ColumnDef, PageConfig, RowKind, PAGES};
pub use toast::{Toast, ToastKind, TOAST_DURATION};
pub use view::{DeleteOutcome, PageListing, PageView};

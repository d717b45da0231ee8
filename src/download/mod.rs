//! Download records, labels and the index that owns them

pub mod index;
pub mod label;
pub mod library;
pub mod record;

pub use index::{DownloadIndex, IndexError, IndexEvent, ProjectionHandle, ProjectionId};
pub use label::{DEFAULT_LABEL_NAME, Label, LabelError, LabelId, LabelStore};
pub use library::LocalLibrary;
pub use record::{DownloadRecord, DownloadState};

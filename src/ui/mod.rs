//! Screen controllers and their render models

pub mod batch;
pub mod download_list;
pub mod events;
pub mod label_list;
pub mod pin;
pub mod row;
pub mod sort;

pub use download_list::{DownloadListController, DownloadListDeps};
pub use events::{ListChange, NavRequest, ViewState};
pub use label_list::LabelListController;

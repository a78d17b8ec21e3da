//! Download-based installation for toolshed.
//!
//! Provides the pieces every download-driven install method shares:
//! - [`Download`] / [`HttpDownloader`]: blocking HTTP client with optional
//!   GitHub bearer authentication
//! - [`extract`]: suffix-dispatched zip, tar.gz and tar.xz extraction
//! - [`BinaryStrategy`]: the `binary` install method

mod binary;
mod download;
pub mod extract;

pub use binary::{BinaryStrategy, file_name_from_url, make_executable};
pub use download::{Download, HttpDownloader, is_github_host};
pub use extract::ArchiveFormat;

//! Array task memoization: catalog lookup before launch, write-back after

pub mod catalog;

pub use catalog::{
    build_download_requests, build_upload_requests, catalog_bitset_to_index_lookup,
    determine_discoverability, write_to_discovery,
};

//! Shared fixtures for rasterflow tests: deterministic test images, a
//! quota-limited allocator, and raw-container helpers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fixtures;

pub use fixtures::{
    gradient_byte, gradient_raw_image, parse_raw_image, solid_gray_raw_image, FailingAllocator,
    RawImage,
};

//! Codecs between [`DynamicImage`](image::DynamicImage) and encoded [`Blob`](cogtiler_core::Blob)s.
//! Each submodule handles one format; pixel-block conversion lives in [`crate::encode`].

pub mod jpeg;
pub mod png;
pub mod webp;

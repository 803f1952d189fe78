mod builder;
mod multipart;

pub use builder::RequestBuilder;
pub use multipart::{Multipart, Part, PartMetadata};

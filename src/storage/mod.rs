//! Media storage module
//!
//! Handles removal and detachment of media attachments stored on local disk.

mod media;

pub use media::{MediaProcessor, MediaService};

#[cfg(test)]
pub use media::MockMediaProcessor;

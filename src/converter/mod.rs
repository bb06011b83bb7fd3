//! Converter capability
//!
//! The pipeline treats conversion as an opaque synchronous operation behind
//! the [`Converter`] trait. The shipped implementation, [`CliConverter`],
//! invokes the per-platform conversion scripts the way the production
//! deployment does; tests inject stubs through the same trait.

mod cli;
mod traits;

pub use cli::{CliConverter, host_platform};
pub use traits::{ConvertRequest, Converter};

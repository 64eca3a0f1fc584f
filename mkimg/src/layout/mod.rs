pub mod error;
pub mod image;
pub mod layout;
pub mod size;

pub use error::*;
pub use image::*;
pub use layout::*;
pub use size::*;

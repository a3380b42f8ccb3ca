//! Generation - procedural and scripted world layouts.

mod layout;
mod terrain;

pub use layout::*;
pub use terrain::*;

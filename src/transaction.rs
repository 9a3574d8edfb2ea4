//! Transaction records split into wire types, the signing envelope, and
//! admission checks

pub mod signed;
pub mod types;
pub mod validation;

pub use signed::*;
pub use types::*;
// validation adds impls on Transaction; there is nothing to re-export

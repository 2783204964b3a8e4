//! §4.4–§4.6 — the three reconfiguration operators.

mod dec;
mod inc;
mod split;

pub use dec::{check_space, dec};
pub use inc::inc;
pub use split::spl;

//! Stage requests and the constraints that gate them.

mod constraints;
mod stage;

pub use constraints::{Constraints, NetworkType};
pub use stage::{StageRequest, StageRequestBuilder};

mod constants;
pub use constants::{MinedConstants, MinedInt};

mod int;
pub use int::{IntStrategy, IntValueTree};

mod param;
pub use param::{Generator, ValueLimits};

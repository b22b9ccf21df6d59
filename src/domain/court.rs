mod error;
mod policy;
mod reservation;
mod schedule;

pub use self::error::*;
pub use self::policy::*;
pub use self::reservation::*;
pub use self::schedule::*;

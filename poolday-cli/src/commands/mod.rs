pub mod calendar;
pub mod expand;
pub mod queue;
pub mod sync;

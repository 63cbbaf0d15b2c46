pub mod brain;
pub mod kb;
pub mod relay;
pub mod schedule;
pub mod sync;
pub mod tasks;

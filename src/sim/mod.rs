pub mod event;
pub mod level;
pub mod schedule;
pub mod session;
pub mod step;
pub mod world;

pub mod beam;
pub mod event;
#[cfg(test)]
mod fixtures;
pub mod grid;
pub mod level;
pub mod ownership;
pub mod resolve;
pub mod schedule;
pub mod session;
pub mod step;

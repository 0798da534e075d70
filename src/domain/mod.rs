pub mod geometry;
pub mod inventory;
pub mod obstacle;
pub mod occupant;
pub mod shape;
pub mod tile;

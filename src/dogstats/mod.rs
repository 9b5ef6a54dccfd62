pub mod cursor;
pub mod encoder;
pub mod line;
pub mod size;
pub mod tags;

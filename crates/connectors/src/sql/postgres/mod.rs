pub mod destination;
pub mod params;
pub mod pool;
pub mod row;
pub mod source;

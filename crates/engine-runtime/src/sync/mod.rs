pub mod placeholders;
pub mod table;

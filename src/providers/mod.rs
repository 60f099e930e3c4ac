pub mod bamboo;
pub mod logs;

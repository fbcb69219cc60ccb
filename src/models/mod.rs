pub mod assignment;
pub mod item;
pub mod matching;
pub mod route;

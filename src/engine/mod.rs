pub mod assignment;
pub mod cost;
pub mod matching;
pub mod planner;
pub mod routing;

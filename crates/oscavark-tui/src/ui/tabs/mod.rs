pub mod classes;
pub mod dashboard;
pub mod modules;
pub mod seniors;

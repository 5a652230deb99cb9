pub mod agent;
pub mod ai;
pub mod directory;
pub mod pipeline;
pub mod scheduling;
pub mod session;
pub mod tools;

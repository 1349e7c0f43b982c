pub mod cluster;
pub mod deployment;
pub mod job;
pub mod organization;
pub mod stage;

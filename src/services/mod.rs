// Services module - one client per external data source plus the uniform
// task wrapper and the manager that fans out across them

pub mod manager;
pub mod service;

// Data sources
pub mod howlongtobeat;
pub mod keyforsteam;
pub mod protondb;
pub mod steam;
pub mod steamdb;

//! Shared contracts between the DealerDesk backend and its clients

pub mod dashboards;
pub mod domain;
pub mod system;

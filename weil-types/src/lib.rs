pub mod canonical;
pub mod constants;
pub mod contract;
pub mod error;
pub mod response;
pub mod transaction;

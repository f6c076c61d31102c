pub mod address;
pub mod hash;
pub mod hd;
pub mod keys;
pub mod seed;

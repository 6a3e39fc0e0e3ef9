pub mod doi;
pub mod hashing;
pub mod jwt;

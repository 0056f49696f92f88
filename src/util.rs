pub mod digest;
pub mod http;
pub mod signature;

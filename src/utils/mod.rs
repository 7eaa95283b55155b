pub mod logger;

pub(crate) mod security;

pub mod sync;

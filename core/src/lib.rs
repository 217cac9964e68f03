pub mod export;
pub mod profiles;
pub mod registry;
pub mod script;
pub mod seed;

pub type Result<T> = anyhow::Result<T>;

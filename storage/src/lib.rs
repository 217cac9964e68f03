pub mod profiles;

pub use profiles::ProfileStore;

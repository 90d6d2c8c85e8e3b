pub mod protocol;
pub mod serialisable;

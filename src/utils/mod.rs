pub mod logging;
pub(crate) mod serialization;

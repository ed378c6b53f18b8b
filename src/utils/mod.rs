pub mod format;
pub mod route;
pub mod serde_helpers;
pub mod storage;
pub mod validation;

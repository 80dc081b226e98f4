//! Data module - CSV loading and processing

mod loader;
mod processor;

pub use loader::{DataLoader, LoaderError};
pub use processor::{DataProcessor, ProcessorError, DATE_FORMAT};

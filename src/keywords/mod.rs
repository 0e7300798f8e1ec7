pub mod extract;

pub use extract::extract_or_empty;

pub mod age;
pub mod values;

pub use age::{age_since, format_age};

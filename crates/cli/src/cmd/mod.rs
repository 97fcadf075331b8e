pub mod preprocess;
pub mod process;

pub mod json_path;
pub mod response;

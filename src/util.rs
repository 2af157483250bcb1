pub mod element_path;
pub mod validating_http_body;

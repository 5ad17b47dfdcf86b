// s3_operations/mod.rs

pub mod bucket_handlers;
pub mod deleter;
pub mod handler_utils;
pub mod hierarchy;
pub mod object_handlers;
pub mod store;

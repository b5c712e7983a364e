pub mod dataset_service;
pub mod memory;
pub mod pagination;

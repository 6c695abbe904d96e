// error and configuration
pub mod error;
pub mod config;

// algorithm module
pub mod algorithm {
    pub mod quantizer;
    pub mod vocabulary;
    pub mod encoder;
    pub mod assembler;
}

// data module
pub mod data {
    pub mod spectrum;
    pub mod binned;
}

// fit / transform session
pub mod binner;

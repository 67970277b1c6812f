pub mod mimetype;
pub mod normalizer;

//! Software block and stream primitives

pub mod aes;
pub mod des;
pub mod rc4;
pub mod twofish;

pub use aes::Aes;
pub use des::{Des, TripleDes};
pub use rc4::Rc4;
pub use twofish::Twofish;

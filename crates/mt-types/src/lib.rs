pub mod errors;
pub mod origin;
pub mod tensor;

pub use errors::*;
pub use origin::*;
pub use tensor::*;

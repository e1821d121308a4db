mod blob;
mod data_type;
mod fmt;
mod operator;
mod pattern;
mod tensor;

#[allow(non_camel_case_types)]
pub type udim = u32;

#[allow(non_camel_case_types)]
pub type idim = i32;

pub use blob::{Blob, Storage};
pub use data_type::{DataType, Element};
pub use nalgebra::DVector;
pub use operator::{InsertDims, Operator};
pub use pattern::Shape;
pub use tensor::Tensor;

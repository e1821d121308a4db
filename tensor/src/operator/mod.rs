mod insert_dims;

use crate::{udim, Shape};

pub trait Operator {
    fn infer_shape(&self, input: &[udim]) -> Shape;
}

pub use insert_dims::InsertDims;

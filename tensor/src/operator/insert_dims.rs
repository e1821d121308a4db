use super::Operator;
use crate::{udim, Shape};

/// 在升序、无重复的位置插入长度为 1 的维度。
#[derive(Clone, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct InsertDims(Vec<usize>);

impl InsertDims {
    /// `dims` 必须升序且无重复，并且能插入到 `rank` 维的输入中。
    pub fn new(dims: Vec<usize>, rank: usize) -> Self {
        assert!(dims.windows(2).all(|w| w[0] < w[1]), "dims: {dims:?}");
        if let Some(&last) = dims.last() {
            assert!(rank + dims.len() > last, "rank {rank}, dims: {dims:?}");
        }
        Self(dims)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    fn check_input(&self, input: &[udim]) -> bool {
        self.0
            .last()
            .map_or(true, |&last| input.len() + self.0.len() > last)
    }
}

impl Operator for InsertDims {
    fn infer_shape(&self, input: &[udim]) -> Shape {
        debug_assert!(self.check_input(input));
        let mut shape = Shape::from_slice(input);
        for &dim in &self.0 {
            shape.insert(dim, 1);
        }
        shape
    }
}

#[test]
fn test() {
    let operator = InsertDims::new(vec![0, 2, 5], 3);
    assert_eq!(
        operator.infer_shape(&[3, 224, 224]),
        Shape::from_slice(&[1, 3, 1, 224, 224, 1])
    );
    assert_eq!(operator.dims(), &[0, 2, 5]);
}

#[test]
fn test_scalar() {
    let operator = InsertDims::new(vec![0, 1], 0);
    assert_eq!(operator.infer_shape(&[]), Shape::from_slice(&[1, 1]));
}

#[test]
#[should_panic]
fn test_out_of_range() {
    InsertDims::new(vec![3], 1);
}

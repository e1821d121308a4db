use crate::{idim, udim};
use nalgebra::DVector;
use smallvec::SmallVec;

/// 各维度步长（以元素计），末尾附加起始偏移。
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Pattern(pub DVector<idim>);

impl Pattern {
    pub fn from_shape(shape: &[udim], offset: idim) -> Self {
        let n = shape.len();
        let mut strides = vec![0; n + 1];
        strides[n] = offset;
        if n > 0 {
            strides[n - 1] = 1;
            for i in (1..n).rev() {
                strides[i - 1] = strides[i] * shape[i] as idim;
            }
        }
        Self(DVector::from_vec(strides))
    }

    #[inline]
    pub fn strides(&self) -> &[idim] {
        &self.0.as_slice()[..self.0.len() - 1]
    }

    #[inline]
    pub fn offset(&self) -> idim {
        self.0[self.0.len() - 1]
    }
}

pub type Shape = SmallVec<[udim; 4]>;

/// 返回元素总数和按行主序展开下标的步长。
pub(crate) fn idx_strides(shape: &[udim]) -> (udim, Vec<udim>) {
    let mut idx_strides = vec![1; shape.len()];
    for i in (1..shape.len()).rev() {
        idx_strides[i - 1] = idx_strides[i] * shape[i];
    }
    let n = match shape.first() {
        Some(&d) => d * idx_strides[0],
        None => 1,
    };
    (n, idx_strides)
}

pub(crate) fn expand_indices(i: udim, idx_strides: &[udim]) -> SmallVec<[idim; 4]> {
    idx_strides
        .iter()
        .scan(i, |rem, &s| {
            let q = *rem / s;
            *rem %= s;
            Some(q as idim)
        })
        .collect()
}

#[test]
fn test() {
    let pattern = Pattern::from_shape(&[2, 3, 4], 5);
    assert_eq!(pattern.strides(), &[12, 4, 1]);
    assert_eq!(pattern.offset(), 5);

    let scalar = Pattern::from_shape(&[], 0);
    assert!(scalar.strides().is_empty());
    assert_eq!(idx_strides(&[]), (1, vec![]));

    let (n, strides) = idx_strides(&[2, 3, 4]);
    assert_eq!(n, 24);
    assert_eq!(expand_indices(17, &strides).as_slice(), &[1, 1, 1]);
}

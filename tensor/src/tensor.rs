use crate::{
    idim,
    pattern::{expand_indices, idx_strides, Pattern},
    udim, DataType, Shape, Storage,
};
use std::ops::Deref;

#[derive(Clone, Debug)]
pub struct Tensor<Physical> {
    data_type: DataType,
    shape: Shape,
    pattern: Pattern,
    physical: Physical,
}

impl<Physical> Tensor<Physical> {
    #[inline]
    pub fn new(data_type: DataType, shape: &[udim], physical: Physical) -> Self {
        Self {
            data_type,
            pattern: Pattern::from_shape(shape, 0),
            shape: Shape::from_slice(shape),
            physical,
        }
    }

    #[inline]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn shape(&self) -> &[udim] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[idim] {
        self.pattern.strides()
    }

    #[inline]
    pub fn offset(&self) -> idim {
        self.pattern.offset()
    }

    /// 元素数量。
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.iter().product::<udim>() as _
    }

    #[inline]
    pub fn bytes_size(&self) -> usize {
        self.size() * self.data_type.size()
    }

    #[inline]
    pub const fn physical(&self) -> &Physical {
        &self.physical
    }

    #[inline]
    pub fn physical_mut(&mut self) -> &mut Physical {
        &mut self.physical
    }

    /// 长度大于 1 的维度按行主序连续排布。
    pub fn is_contiguous(&self) -> bool {
        let contiguous = Pattern::from_shape(&self.shape, 0);
        self.shape
            .iter()
            .zip(self.strides().iter().zip(contiguous.strides()))
            .all(|(&d, (a, b))| d <= 1 || a == b)
    }

    /// 替换形状，不改变存储。只适用于连续张量且元素数量不变。
    pub fn reshape(&mut self, shape: &[udim]) {
        assert!(self.is_contiguous(), "reshape a non-contiguous tensor");
        assert_eq!(
            self.size(),
            shape.iter().product::<udim>() as usize,
            "reshape {:?} to {shape:?}",
            self.shape,
        );
        self.pattern = Pattern::from_shape(shape, self.pattern.offset());
        self.shape = Shape::from_slice(shape);
    }

}

impl<Physical: Deref<Target = [u8]>> Tensor<Physical> {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.physical
    }

    /// 访问所有元素需要的最少字节数，即最远可达元素的末尾。
    pub fn required_bytes(&self) -> usize {
        if self.shape.contains(&0) {
            return 0;
        }
        let last = self
            .shape
            .iter()
            .zip(self.strides())
            .map(|(&d, &s)| (d as isize - 1) * s.max(0) as isize)
            .sum::<isize>()
            + self.offset() as isize;
        (last as usize + 1) * self.data_type.size()
    }

    /// 按行主序读出第 `i` 个元素的字节。
    pub(crate) fn element(&self, i: udim, idx_strides: &[udim]) -> &[u8] {
        let size = self.data_type.size();
        let offset = expand_indices(i, idx_strides)
            .iter()
            .zip(self.strides())
            .map(|(&i, &s)| i as isize * s as isize)
            .sum::<isize>()
            + self.offset() as isize;
        &self.physical[offset as usize * size..][..size]
    }
}

impl<Physical: Storage> Tensor<Physical> {
    /// 复制 `src` 的数据类型、形状和数据，结果总是连续的。
    ///
    /// `src` 的存储不少于 [`Tensor::required_bytes`]，否则 panic。
    pub fn copy_from<U>(&mut self, src: &Tensor<U>)
    where
        U: Deref<Target = [u8]>,
    {
        let len = src.bytes_size();
        self.physical.resize(len);

        if src.is_contiguous() {
            let offset = src.offset() as usize * src.data_type.size();
            self.physical
                .copy_from_slice(&src.physical[offset..][..len]);
        } else {
            let size = src.data_type.size();
            let (n, idx_strides) = idx_strides(&src.shape);
            for i in 0..n {
                self.physical[i as usize * size..][..size]
                    .copy_from_slice(src.element(i, &idx_strides));
            }
        }

        self.data_type = src.data_type;
        self.shape = src.shape.clone();
        self.pattern = Pattern::from_shape(&self.shape, 0);
    }
}

#[cfg(test)]
fn arange(shape: &[udim]) -> Tensor<crate::Blob> {
    let n = shape.iter().product::<udim>();
    let data = (0..n as i32).flat_map(i32::to_ne_bytes).collect::<Vec<_>>();
    Tensor::new(DataType::I32, shape, crate::Blob::from_slice(&data))
}

#[cfg(test)]
fn values(t: &Tensor<impl Deref<Target = [u8]>>) -> Vec<i32> {
    let (n, idx_strides) = idx_strides(t.shape());
    (0..n)
        .map(|i| i32::from_ne_bytes(t.element(i, &idx_strides).try_into().unwrap()))
        .collect()
}

#[test]
fn test_reshape() {
    let mut t = arange(&[2, 3]);
    t.reshape(&[3, 1, 2]);
    assert_eq!(t.shape(), &[3, 1, 2]);
    assert_eq!(t.strides(), &[2, 2, 1]);
    assert_eq!(values(&t), (0..6).collect::<Vec<_>>());
}

#[test]
#[should_panic]
fn test_reshape_size() {
    arange(&[2, 3]).reshape(&[7]);
}

#[test]
fn test_copy_from() {
    let src = arange(&[2, 3]);
    let mut dst = Tensor::new(DataType::F32, &[5], crate::Blob::new(20));
    dst.copy_from(&src);
    assert_eq!(dst.data_type(), DataType::I32);
    assert_eq!(dst.shape(), &[2, 3]);
    assert_eq!(dst.as_slice(), src.as_slice());

    let scalar = Tensor::new(DataType::I32, &[], crate::Blob::from_slice(&9i32.to_ne_bytes()));
    dst.copy_from(&scalar);
    assert_eq!(dst.size(), 1);
    assert_eq!(values(&dst), [9]);

    let empty = Tensor::new(DataType::I32, &[2, 0], crate::Blob::new(0));
    dst.copy_from(&empty);
    assert_eq!(dst.shape(), &[2, 0]);
    assert!(dst.as_slice().is_empty());
}

#[test]
fn test_copy_from_strided() {
    // [[0 1 2] [3 4 5]] 的转置视图
    let mut src = arange(&[2, 3]);
    src.shape = Shape::from_slice(&[3, 2]);
    src.pattern = Pattern(crate::DVector::from_vec(vec![1, 3, 0]));
    assert!(!src.is_contiguous());

    let mut dst = Tensor::new(DataType::I32, &[], Vec::<u8>::new());
    dst.copy_from(&src);
    assert!(dst.is_contiguous());
    assert_eq!(values(&dst), [0, 3, 1, 4, 2, 5]);
}

#[test]
fn test_required_bytes() {
    let mut t = arange(&[2, 3]);
    assert_eq!(t.required_bytes(), 24);

    // 转置视图仍然覆盖全部 6 个元素
    t.shape = Shape::from_slice(&[3, 2]);
    t.pattern = Pattern(crate::DVector::from_vec(vec![1, 3, 0]));
    assert_eq!(t.required_bytes(), 24);

    // 带偏移的单行视图
    t.shape = Shape::from_slice(&[3]);
    t.pattern = Pattern(crate::DVector::from_vec(vec![1, 3]));
    assert_eq!(t.required_bytes(), 24);

    let scalar = Tensor::new(DataType::F64, &[], crate::Blob::new(0));
    assert_eq!(scalar.required_bytes(), 8);

    let empty = Tensor::new(DataType::F64, &[4, 0], crate::Blob::new(0));
    assert_eq!(empty.required_bytes(), 0);
}

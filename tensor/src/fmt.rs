use crate::{
    pattern::{expand_indices, idx_strides},
    udim, DataType, Tensor,
};
use half::{bf16, f16};
use std::{fmt, ops::Deref};

fn write_tensor(
    to: &mut fmt::Formatter<'_>,
    shape: &[udim],
    cell: impl Fn(&mut fmt::Formatter<'_>, &[udim]) -> fmt::Result,
) -> fmt::Result {
    match shape {
        [] => {
            writeln!(to, "<>")?;
            write_matrix(to, (1, 1), |to, _, _| cell(to, &[]))
        }
        &[len] => {
            writeln!(to, "<{len}>")?;
            write_matrix(to, (len, 1), |to, r, _| cell(to, &[r]))
        }
        &[rows, cols] => {
            writeln!(to, "<{rows}x{cols}>")?;
            write_matrix(to, (rows, cols), |to, r, c| cell(to, &[r, c]))
        }
        [batch @ .., rows, cols] => {
            let (n, idx_strides) = idx_strides(batch);
            for i in 0..n {
                let indices = expand_indices(i, &idx_strides);
                writeln!(
                    to,
                    "<{rows}x{cols}>[{}]",
                    indices
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                )?;
                let mut full = indices.iter().map(|&i| i as udim).collect::<Vec<_>>();
                full.extend([0, 0]);
                write_matrix(to, (*rows, *cols), |to, r, c| {
                    let k = full.len();
                    let mut full = full.clone();
                    full[k - 2] = r;
                    full[k - 1] = c;
                    cell(to, &full)
                })?;
            }
            Ok(())
        }
    }
}

fn write_matrix(
    to: &mut fmt::Formatter<'_>,
    shape: (udim, udim),
    cell: impl Fn(&mut fmt::Formatter<'_>, udim, udim) -> fmt::Result,
) -> fmt::Result {
    let (rows, cols) = shape;
    for r in 0..rows {
        for c in 0..cols {
            cell(to, r, c)?;
            write!(to, " ")?;
        }
        writeln!(to)?;
    }
    Ok(())
}

impl<Physical: Deref<Target = [u8]>> fmt::Display for Tensor<Physical> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.data_type().size();
        let locate = |indices: &[udim]| {
            let offset = indices
                .iter()
                .zip(self.strides())
                .map(|(&i, &s)| i as isize * s as isize)
                .sum::<isize>()
                + self.offset() as isize;
            &self.as_slice()[offset as usize * size..][..size]
        };
        macro_rules! write_tensor {
            ($ty:ty, $fmt:literal) => {
                write_tensor!($ty, $fmt, |val| val)
            };
            ($ty:ty, $fmt:literal, $map:expr) => {
                write_tensor(f, self.shape(), |to, indices| {
                    let bytes = locate(indices);
                    let val = unsafe { bytes.as_ptr().cast::<$ty>().read_unaligned() };
                    write!(to, $fmt, $map(val))
                })
            };
        }
        match self.data_type() {
            // 任意字节都不一定是合法的 bool
            DataType::Bool => write_tensor!(u8, "{:>5}", |val: u8| val != 0),
            DataType::I8 => write_tensor!(i8, "{:>6}"),
            DataType::I16 => write_tensor!(i16, "{:>6}"),
            DataType::I32 => write_tensor!(i32, "{:>9}"),
            DataType::I64 => write_tensor!(i64, "{:>9}"),
            DataType::U8 => write_tensor!(u8, "{:>6}"),
            DataType::U16 => write_tensor!(u16, "{:>6}"),
            DataType::U32 => write_tensor!(u32, "{:>9}"),
            DataType::U64 => write_tensor!(u64, "{:>9}"),
            DataType::F16 => write_tensor!(f16, "{:>9.3e}"),
            DataType::BF16 => write_tensor!(bf16, "{:>9.3e}"),
            DataType::F32 => write_tensor!(f32, "{:>9.3e}"),
            DataType::F64 => write_tensor!(f64, "{:>9.3e}"),
        }
    }
}

#[test]
fn test_fmt() {
    use crate::{Blob, InsertDims, Operator};
    use std::mem::size_of;

    let data = [
        0.0f32, 1., 2., 3., //
        04., 05., 06., 07., //
        08., 09., 10., 11., //
        //
        12., 13., 14., 15., //
        16., 17., 18., 19., //
        20., 21., 22., 23., //
    ];
    let data = unsafe {
        std::slice::from_raw_parts(data.as_ptr().cast::<u8>(), data.len() * size_of::<f32>())
    };

    let mut t = Tensor::new(DataType::F32, &[2, 3, 4], Blob::from_slice(data));
    let text = t.to_string();
    assert!(text.starts_with("<3x4>[0]\n"));
    assert!(text.contains("<3x4>[1]\n"));

    t.reshape(&[6, 4]);
    assert!(t.to_string().starts_with("<6x4>\n"));

    let shape = InsertDims::new(vec![1], 2).infer_shape(t.shape());
    t.reshape(&shape);
    let text = t.to_string();
    assert_eq!(text.lines().filter(|l| l.starts_with("<1x4>")).count(), 6);
    println!("{text}");

    let scalar = Tensor::new(DataType::I64, &[], Blob::from_slice(&42i64.to_ne_bytes()));
    assert_eq!(scalar.to_string(), "<>\n       42 \n");

    let mask = Tensor::new(DataType::Bool, &[3], Blob::from_slice(&[0, 2, 1]));
    assert_eq!(mask.to_string(), "<3>\nfalse \n true \n true \n");
}

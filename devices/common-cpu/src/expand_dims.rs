use common_devices::{unary, Attributes, Kernel, KernelError};
use itertools::Itertools;
use log::{debug, warn};
use serde::Deserialize;
use std::{marker::PhantomData, ops::Deref};
use tensor::{Blob, Element, InsertDims, Operator, Storage, Tensor};

pub(crate) const SCHEMA: &str = "ExpandDims";

#[derive(Clone, Default, Deserialize, Debug)]
pub struct ExpandDimsAttrs {
    #[serde(default)]
    pub dims: Vec<i64>,
}

/// 规范化的插入位置：非空、升序、无重复、非负。
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Dims(Vec<usize>);

fn normalize(raw: &[i64]) -> Vec<i64> {
    raw.iter().copied().sorted_unstable().dedup().collect()
}

impl Dims {
    pub fn new(raw: &[i64]) -> Result<Self, KernelError> {
        if raw.is_empty() {
            return Err(KernelError::InvalidArgument(
                "Parameter `dims` must be provided.".into(),
            ));
        }
        let dims = normalize(raw);
        if dims.len() < raw.len() {
            warn!(target: SCHEMA, "Parameter `dims` has repeated dimensions.");
        }
        if dims[0] < 0 {
            return Err(KernelError::InvalidArgument(
                "Dimension ids must be non-negative.".into(),
            ));
        }
        dims.into_iter()
            .map(|d| {
                usize::try_from(d).map_err(|_| {
                    KernelError::InvalidArgument(format!("Dimension id {d} is out of range."))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// 秩为 `rank` 的输入是否有足够的维度插入这些位置。
    pub fn check_rank(&self, rank: usize) -> Result<(), KernelError> {
        match self.0.last() {
            // rank + k < last + 1，写成不会溢出的形式
            Some(&last) if rank.saturating_add(self.0.len()) <= last => {
                Err(KernelError::InvalidArgument(format!(
                    "Input needs at least {} dimensions given `dims`.",
                    last - self.0.len() + 1,
                )))
            }
            _ => Ok(()),
        }
    }

    fn same_as(&self, raw: &[i64]) -> bool {
        normalize(raw)
            .into_iter()
            .map(|d| usize::try_from(d).ok())
            .eq(self.0.iter().map(|&d| Some(d)))
    }
}

/// 算子实例的状态，在首次调用时确定插入位置，此后不再改变。
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub enum State {
    #[default]
    Uninitialized,
    Ready(Dims),
}

impl State {
    pub fn get_or_init(&mut self, raw: &[i64]) -> Result<&Dims, KernelError> {
        match self {
            Self::Uninitialized => *self = Self::Ready(Dims::new(raw)?),
            Self::Ready(dims) => {
                if !dims.same_as(raw) {
                    debug!(target: SCHEMA, "`dims` {raw:?} ignored, keep {:?}", dims.as_slice());
                }
            }
        }
        match &*self {
            Self::Ready(dims) => Ok(dims),
            Self::Uninitialized => unreachable!(),
        }
    }
}

/// 把 `input` 复制到 `output`，并在 `dims` 指定的位置插入长度为 1 的维度。
///
/// `dims` 只在 `state` 未初始化时生效。
/// 所有检查都在复制之前完成，失败时 `output` 保持原样。
pub fn expand_dims<E, T, U>(
    output: &mut Tensor<T>,
    input: &Tensor<U>,
    dims: &[i64],
    state: &mut State,
) -> Result<(), KernelError>
where
    E: Element,
    T: Storage,
    U: Deref<Target = [u8]>,
{
    let dims = state.get_or_init(dims)?;
    if input.data_type() != E::DATA_TYPE {
        return Err(KernelError::InvalidArgument(format!(
            "expect {} input, got {}",
            E::DATA_TYPE,
            input.data_type(),
        )));
    }
    let rank = input.shape().len();
    dims.check_rank(rank)?;
    let required = input.required_bytes();
    if input.as_slice().len() < required {
        return Err(KernelError::InvalidArgument(format!(
            "Input needs {required} bytes, got {}.",
            input.as_slice().len(),
        )));
    }

    output.copy_from(input);
    if dims.as_slice().is_empty() {
        return Ok(());
    }

    let shape = InsertDims::new(dims.as_slice().to_vec(), rank).infer_shape(input.shape());
    output.reshape(&shape);
    Ok(())
}

pub struct ExpandDims<E> {
    state: State,
    _element: PhantomData<E>,
}

impl<E> Default for ExpandDims<E> {
    #[inline]
    fn default() -> Self {
        Self {
            state: State::Uninitialized,
            _element: PhantomData,
        }
    }
}

impl<E> ExpandDims<E> {
    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }
}

impl<E: Element> Kernel for ExpandDims<E> {
    fn launch(
        &mut self,
        inputs: &[&Tensor<Blob>],
        outputs: &mut [Tensor<Blob>],
        attrs: &Attributes,
    ) -> Result<(), KernelError> {
        let (input, output) = unary(inputs, outputs)?;
        let dims = match attrs.parse::<ExpandDimsAttrs>() {
            Ok(ExpandDimsAttrs { dims }) => dims,
            // 已锁定的实例不再读取 dims
            Err(e) if matches!(self.state, State::Ready(_)) => {
                debug!(target: SCHEMA, "{e}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        expand_dims::<E, _, _>(output, input, &dims, &mut self.state)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tensor::{udim, DataType};

    fn arange(shape: &[udim]) -> Tensor<Blob> {
        let n = shape.iter().product::<udim>();
        let data = (0..n)
            .flat_map(|i| (i as f32).to_ne_bytes())
            .collect::<Vec<_>>();
        Tensor::new(DataType::F32, shape, Blob::from_slice(&data))
    }

    fn placeholder() -> Tensor<Blob> {
        Tensor::new(DataType::F32, &[5], Blob::new(20))
    }

    /// 按线程收集日志，测试可以并行运行。
    mod capture {
        use log::{Level, LevelFilter, Log, Metadata, Record};
        use std::{cell::RefCell, sync::Once};

        thread_local! {
            static RECORDS: RefCell<Vec<(Level, String, String)>> = const { RefCell::new(Vec::new()) };
        }

        struct Capture;

        impl Log for Capture {
            fn enabled(&self, _: &Metadata) -> bool {
                true
            }

            fn log(&self, record: &Record) {
                RECORDS.with(|records| {
                    records.borrow_mut().push((
                        record.level(),
                        record.target().to_string(),
                        record.args().to_string(),
                    ))
                });
            }

            fn flush(&self) {}
        }

        static LOGGER: Capture = Capture;
        static INIT: Once = Once::new();

        pub fn start() {
            INIT.call_once(|| {
                log::set_logger(&LOGGER)
                    .map(|()| log::set_max_level(LevelFilter::Trace))
                    .unwrap();
            });
            RECORDS.with(|records| records.borrow_mut().clear());
        }

        /// 取出本线程记录的所有警告：(target, message)。
        pub fn warnings() -> Vec<(String, String)> {
            RECORDS.with(|records| {
                records
                    .take()
                    .into_iter()
                    .filter(|(level, ..)| *level == Level::Warn)
                    .map(|(_, target, message)| (target, message))
                    .collect()
            })
        }
    }

    fn invalid(e: KernelError) -> String {
        match e {
            KernelError::InvalidArgument(msg) => msg,
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_shape() {
        let input = arange(&[2, 3]);
        let mut output = placeholder();
        let mut state = State::default();
        expand_dims::<f32, _, _>(&mut output, &input, &[0, 2], &mut state).unwrap();
        assert_eq!(output.shape(), &[1, 2, 1, 3]);
        assert_eq!(output.data_type(), DataType::F32);
        assert_eq!(output.as_slice(), input.as_slice());
        assert_eq!(state, State::Ready(Dims(vec![0, 2])));
    }

    #[test]
    fn test_normalize() {
        let dims = Dims::new(&[2, 0, 2, 1]).unwrap();
        assert_eq!(dims.as_slice(), &[0, 1, 2]);
        assert_eq!(dims, Dims::new(&[0, 1, 2]).unwrap());

        let input = arange(&[2, 3, 4]);
        let mut a = placeholder();
        let mut b = placeholder();
        expand_dims::<f32, _, _>(&mut a, &input, &[2, 0, 2, 1], &mut State::default()).unwrap();
        expand_dims::<f32, _, _>(&mut b, &input, &[0, 1, 2], &mut State::default()).unwrap();
        assert_eq!(a.shape(), &[1, 1, 1, 2, 3, 4]);
        assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn test_latched() {
        let input = arange(&[2, 3]);
        let mut output = placeholder();
        let mut state = State::default();
        expand_dims::<f32, _, _>(&mut output, &input, &[1], &mut state).unwrap();
        assert_eq!(output.shape(), &[2, 1, 3]);

        // 后续调用沿用首次调用的 dims
        let calls: [&[i64]; 3] = [&[0, 3], &[-1], &[]];
        for dims in calls {
            let mut output = placeholder();
            expand_dims::<f32, _, _>(&mut output, &input, dims, &mut state).unwrap();
            assert_eq!(output.shape(), &[2, 1, 3]);
        }
        assert_eq!(state, State::Ready(Dims(vec![1])));
    }

    #[test]
    fn test_empty_dims() {
        let input = arange(&[2, 3]);
        let mut output = placeholder();
        let mut state = State::default();
        let e = expand_dims::<f32, _, _>(&mut output, &input, &[], &mut state).unwrap_err();
        assert_eq!(invalid(e), "Parameter `dims` must be provided.");
        assert_eq!(state, State::Uninitialized);
        assert_eq!(output.shape(), &[5]);

        // 失败不会锁定状态，下一次调用仍会初始化
        expand_dims::<f32, _, _>(&mut output, &input, &[2], &mut state).unwrap();
        assert_eq!(output.shape(), &[2, 3, 1]);
    }

    #[test]
    fn test_negative() {
        let input = arange(&[2, 3]);
        let calls: [&[i64]; 2] = [&[-1], &[1, -1]];
        for dims in calls {
            let mut output = placeholder();
            let mut state = State::default();
            let e = expand_dims::<f32, _, _>(&mut output, &input, dims, &mut state).unwrap_err();
            assert_eq!(invalid(e), "Dimension ids must be non-negative.");
            assert_eq!(state, State::Uninitialized);
            assert_eq!(output.shape(), &[5]);
        }
    }

    #[test]
    fn test_duplicated() {
        let input = arange(&[2, 3]);
        let mut output = placeholder();
        capture::start();
        expand_dims::<f32, _, _>(&mut output, &input, &[1, 1], &mut State::default()).unwrap();
        assert_eq!(output.shape(), &[2, 1, 3]);
        assert_eq!(output.as_slice(), input.as_slice());
        assert_eq!(
            capture::warnings(),
            [(
                SCHEMA.to_string(),
                "Parameter `dims` has repeated dimensions.".to_string()
            )]
        );

        let mut output = placeholder();
        capture::start();
        expand_dims::<f32, _, _>(&mut output, &input, &[0, 2], &mut State::default()).unwrap();
        assert!(capture::warnings().is_empty());
    }

    #[test]
    fn test_insufficient_rank() {
        let input = arange(&[4]);
        let mut output = placeholder();
        let e = expand_dims::<f32, _, _>(&mut output, &input, &[3], &mut State::default())
            .unwrap_err();
        assert_eq!(invalid(e), "Input needs at least 3 dimensions given `dims`.");
        // 检查先于复制，输出没有被改动
        assert_eq!(output.shape(), &[5]);
        assert_eq!(output.as_slice(), &[0; 20]);

        // rank + k == max + 1 恰好满足
        let mut output = placeholder();
        expand_dims::<f32, _, _>(&mut output, &input, &[0, 2], &mut State::default()).unwrap();
        assert_eq!(output.shape(), &[1, 4, 1]);
    }

    #[test]
    fn test_out_of_range() {
        // 巨大的维度号不会溢出，只会报告秩不足
        let e = Dims(vec![usize::MAX]).check_rank(2).unwrap_err();
        assert_eq!(
            invalid(e),
            format!("Input needs at least {} dimensions given `dims`.", usize::MAX),
        );
        assert!(Dims::new(&[i64::MAX])
            .and_then(|dims| dims.check_rank(4))
            .is_err());
    }

    #[test]
    fn test_short_input() {
        let input = Tensor::new(DataType::F32, &[2, 3], Blob::new(4));
        let mut output = placeholder();
        let mut state = State::default();
        let e = expand_dims::<f32, _, _>(&mut output, &input, &[0], &mut state).unwrap_err();
        assert_eq!(invalid(e), "Input needs 24 bytes, got 4.");
        assert_eq!(output.shape(), &[5]);

        let mut outputs = [placeholder()];
        let e = ExpandDims::<f32>::default()
            .launch(&[&input], &mut outputs, &Attributes::new().with("dims", vec![0]))
            .unwrap_err();
        assert_eq!(invalid(e), "Input needs 24 bytes, got 4.");
    }

    #[test]
    fn test_scalar() {
        let input = Tensor::new(DataType::I64, &[], Blob::from_slice(&7i64.to_ne_bytes()));
        let mut output = placeholder();
        expand_dims::<i64, _, _>(&mut output, &input, &[0, 1], &mut State::default()).unwrap();
        assert_eq!(output.shape(), &[1, 1]);
        assert_eq!(output.data_type(), DataType::I64);
        assert_eq!(output.as_slice(), &7i64.to_ne_bytes());
    }

    #[test]
    fn test_data_type() {
        let input = arange(&[2, 3]);
        let mut output = placeholder();
        let e = expand_dims::<f64, _, _>(&mut output, &input, &[0], &mut State::default())
            .unwrap_err();
        assert_eq!(invalid(e), "expect float64 input, got float32");
    }

    #[test]
    fn test_kernel() {
        let input = arange(&[2, 3]);
        let mut outputs = [placeholder()];
        let mut kernel = ExpandDims::<f32>::default();
        assert_eq!(kernel.state(), &State::Uninitialized);

        let attrs = Attributes::new().with("dims", vec![2, 0]);
        kernel.launch(&[&input], &mut outputs, &attrs).unwrap();
        assert_eq!(outputs[0].shape(), &[1, 2, 1, 3]);
        assert_eq!(kernel.state(), &State::Ready(Dims(vec![0, 2])));

        // 锁定之后，格式错误的 dims 同样被忽略
        let attrs = r#"{"dims": [0.5]}"#.parse::<Attributes>().unwrap();
        let mut outputs = [placeholder()];
        kernel.launch(&[&input], &mut outputs, &attrs).unwrap();
        assert_eq!(outputs[0].shape(), &[1, 2, 1, 3]);

        let mut kernel = ExpandDims::<f32>::default();
        let e = kernel.launch(&[&input], &mut outputs, &attrs).unwrap_err();
        assert!(invalid(e).starts_with("bad attributes: "));
        assert_eq!(kernel.state(), &State::Uninitialized);

        let mut kernel = ExpandDims::<f32>::default();
        let e = kernel
            .launch(&[&input], &mut outputs, &Attributes::new())
            .unwrap_err();
        assert_eq!(invalid(e), "Parameter `dims` must be provided.");
    }
}

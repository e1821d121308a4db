use crate::LogArgs;
use common_cpu::{
    common_devices::{Attributes, Backend, KernelKey},
    registry,
    tensor::{udim, Blob, DataType, Tensor},
};
use half::{bf16, f16};
use log::{error, info};
use std::{process::exit, time::Instant};

#[derive(Args)]
pub(crate) struct ExpandDimsArgs {
    /// Input shape, comma separated. Omit for a scalar.
    #[clap(long, value_delimiter = ',')]
    shape: Vec<udim>,
    /// Positions of the inserted dimensions, comma separated.
    #[clap(long, value_delimiter = ',', allow_hyphen_values = true)]
    dims: Vec<i64>,
    /// Kernel attributes as a json object, overrides `--dims`.
    #[clap(long)]
    attrs: Option<String>,
    /// Element type.
    #[clap(long, default_value = "float32")]
    dtype: DataType,
    /// Launch the same kernel instance this many times.
    #[clap(long, default_value_t = 1)]
    repeat: usize,
    #[clap(flatten)]
    log: LogArgs,
}

impl ExpandDimsArgs {
    pub fn invoke(self) {
        self.log.init();

        let attrs = match self.attrs.as_deref() {
            Some(json) => json.parse::<Attributes>().unwrap_or_else(|e| {
                error!("{e}");
                exit(1)
            }),
            None => Attributes::new().with("dims", self.dims.clone()),
        };
        let dt = self.dtype;
        let input = arange(dt, &self.shape);

        let registry = registry();
        let key = KernelKey {
            schema: "ExpandDims",
            backend: Backend::Cpu,
            data_type: dt,
        };
        let mut kernel = registry.instantiate(key).unwrap_or_else(|e| {
            error!("{e}");
            exit(1)
        });

        let mut outputs = [Tensor::new(dt, &[], Blob::new(0))];
        for i in 0..self.repeat.max(1) {
            let time = Instant::now();
            if let Err(e) = kernel.launch(&[&input], &mut outputs, &attrs) {
                error!("{e}");
                exit(1)
            }
            info!("launch {key} #{i} ... {:?}", time.elapsed());
        }

        let output = &outputs[0];
        println!("{:?} -> {:?}", input.shape(), output.shape());
        println!("{output}");
    }
}

/// 以 0, 1, 2, ... 填充的张量。
fn arange(dt: DataType, shape: &[udim]) -> Tensor<Blob> {
    let n = shape.iter().product::<udim>() as usize;
    macro_rules! fill {
        ($i:ident => $val:expr) => {
            (0..n)
                .flat_map(|$i| ($val).to_ne_bytes())
                .collect::<Vec<u8>>()
        };
    }
    let data = match dt {
        DataType::Bool => (0..n).map(|i| (i % 2) as u8).collect(),
        DataType::I8 => fill!(i => i as i8),
        DataType::I16 => fill!(i => i as i16),
        DataType::I32 => fill!(i => i as i32),
        DataType::I64 => fill!(i => i as i64),
        DataType::U8 => fill!(i => i as u8),
        DataType::U16 => fill!(i => i as u16),
        DataType::U32 => fill!(i => i as u32),
        DataType::U64 => fill!(i => i as u64),
        DataType::F16 => fill!(i => f16::from_f32(i as f32)),
        DataType::BF16 => fill!(i => bf16::from_f32(i as f32)),
        DataType::F32 => fill!(i => i as f32),
        DataType::F64 => fill!(i => i as f64),
    };
    Tensor::new(dt, shape, Blob::from_slice(&data))
}

#[test]
fn test_arange() {
    let t = arange(DataType::I16, &[2, 3]);
    assert_eq!(t.bytes_size(), 12);
    assert_eq!(&t.as_slice()[10..], &5i16.to_ne_bytes());

    let t = arange(DataType::Bool, &[]);
    assert_eq!(t.as_slice(), &[0]);
}

mod expand_dims;

use common_devices::{Backend, Kernel, KernelKey, Registry};
use half::{bf16, f16};
use tensor::Element;

pub extern crate common_devices;
pub extern crate tensor;

pub use expand_dims::{expand_dims, Dims, ExpandDims, ExpandDimsAttrs, State};

/// 把 CPU 上实现的所有算子注册到 `registry`。
pub fn register(registry: &mut Registry) {
    fn expand_dims_of<E: Element>() -> Box<dyn Kernel> {
        Box::<ExpandDims<E>>::default()
    }

    macro_rules! register_expand_dims {
        ($($ty:ty),+) => {
            $(
                registry.register(
                    KernelKey {
                        schema: expand_dims::SCHEMA,
                        backend: Backend::Cpu,
                        data_type: <$ty as Element>::DATA_TYPE,
                    },
                    expand_dims_of::<$ty>,
                );
            )+
        };
    }

    register_expand_dims!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f16, bf16, f32, f64);
}

/// 只包含 CPU 算子的注册表。
pub fn registry() -> Registry {
    let mut ans = Registry::new();
    register(&mut ans);
    ans
}

#[test]
fn test_registry() {
    use common_devices::Attributes;
    use tensor::{Blob, DataType, Tensor};

    let registry = registry();
    for dt in DataType::ALL {
        assert!(registry.contains(&KernelKey {
            schema: "ExpandDims",
            backend: Backend::Cpu,
            data_type: dt,
        }));
    }

    let key = KernelKey {
        schema: "ExpandDims",
        backend: Backend::Cpu,
        data_type: DataType::F16,
    };
    let data = [1.5f32, -2., 0.25]
        .map(f16::from_f32)
        .iter()
        .flat_map(|x| x.to_ne_bytes())
        .collect::<Vec<_>>();
    let input = Tensor::new(DataType::F16, &[3], Blob::from_slice(&data));
    let mut outputs = [Tensor::new(DataType::F16, &[], Blob::new(0))];
    let attrs = r#"{"dims": [1, 0]}"#.parse::<Attributes>().unwrap();

    let mut kernel = registry.instantiate(key).unwrap();
    kernel.launch(&[&input], &mut outputs, &attrs).unwrap();
    assert_eq!(outputs[0].shape(), &[1, 1, 3]);
    assert_eq!(outputs[0].as_slice(), &*data);

    // f16 的实现不接受 f32 的输入
    let input = Tensor::new(DataType::F32, &[3], Blob::new(12));
    assert!(kernel.launch(&[&input], &mut outputs, &attrs).is_err());
}

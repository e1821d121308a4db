use crate::{Kernel, KernelError};
use log::{debug, warn};
use std::{collections::HashMap, fmt};
use tensor::DataType;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Backend {
    Cpu,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("CPU"),
        }
    }
}

/// 分发键：算子名、后端和元素类型共同决定一个实现。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct KernelKey {
    pub schema: &'static str,
    pub backend: Backend,
    pub data_type: DataType,
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.schema, self.backend, self.data_type)
    }
}

pub type KernelFactory = fn() -> Box<dyn Kernel>;

#[derive(Default)]
pub struct Registry(HashMap<KernelKey, KernelFactory>);

impl Registry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: KernelKey, factory: KernelFactory) {
        if self.0.insert(key, factory).is_some() {
            warn!(target: "kernel registry", "{key} registered twice, the later one wins");
        } else {
            debug!(target: "kernel registry", "register {key}");
        }
    }

    /// 创建一个新的算子实例，实例状态未初始化。
    pub fn instantiate(&self, key: KernelKey) -> Result<Box<dyn Kernel>, KernelError> {
        self.0
            .get(&key)
            .map(|factory| factory())
            .ok_or(KernelError::NotRegistered(key))
    }

    #[inline]
    pub fn contains(&self, key: &KernelKey) -> bool {
        self.0.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{unary, Attributes};
    use tensor::{Blob, Tensor};

    /// 记录调用次数的恒等算子。
    #[derive(Default)]
    struct Identity {
        launched: usize,
    }

    impl Kernel for Identity {
        fn launch(
            &mut self,
            inputs: &[&Tensor<Blob>],
            outputs: &mut [Tensor<Blob>],
            _attrs: &Attributes,
        ) -> Result<(), KernelError> {
            let (input, output) = unary(inputs, outputs)?;
            output.copy_from(input);
            self.launched += 1;
            // 用输出的首字节记录这是实例的第几次调用
            output.physical_mut()[0] = self.launched as u8;
            Ok(())
        }
    }

    const KEY: KernelKey = KernelKey {
        schema: "Identity",
        backend: Backend::Cpu,
        data_type: DataType::U8,
    };

    #[test]
    fn test_dispatch() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.register(KEY, || -> Box<dyn Kernel> { Box::<Identity>::default() });
        assert!(registry.contains(&KEY));
        assert_eq!(registry.len(), 1);

        let input = Tensor::new(DataType::U8, &[2], Blob::from_slice(&[0, 9]));
        let mut outputs = [Tensor::new(DataType::U8, &[], Blob::new(0))];

        let mut kernel = registry.instantiate(KEY).unwrap();
        for i in 1..=2 {
            kernel
                .launch(&[&input], &mut outputs, &Attributes::new())
                .unwrap();
            assert_eq!(outputs[0].as_slice(), &[i, 9]);
        }

        // 新实例有新的状态
        let mut kernel = registry.instantiate(KEY).unwrap();
        kernel
            .launch(&[&input], &mut outputs, &Attributes::new())
            .unwrap();
        assert_eq!(outputs[0].as_slice(), &[1, 9]);

        assert!(matches!(
            kernel.launch(&[], &mut outputs, &Attributes::new()),
            Err(KernelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_not_registered() {
        let registry = Registry::new();
        let key = KernelKey {
            data_type: DataType::F32,
            ..KEY
        };
        assert_eq!(
            registry.instantiate(key).err(),
            Some(KernelError::NotRegistered(key))
        );
    }
}

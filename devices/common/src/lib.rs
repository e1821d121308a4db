mod attributes;
mod error;
mod registry;

use tensor::{Blob, Tensor};

pub use attributes::Attributes;
pub use error::KernelError;
pub use registry::{Backend, KernelFactory, KernelKey, Registry};

/// 由分发框架实例化的算子实现。
///
/// 每个实例拥有自己的状态，状态在实例的生命周期内跨调用保留。
/// `launch` 需要独占引用，因此同一实例的首次初始化不会并发进行。
pub trait Kernel: Send {
    fn launch(
        &mut self,
        inputs: &[&Tensor<Blob>],
        outputs: &mut [Tensor<Blob>],
        attrs: &Attributes,
    ) -> Result<(), KernelError>;
}

/// 取出单输入单输出算子的参数。
pub fn unary<'a, 'b>(
    inputs: &[&'a Tensor<Blob>],
    outputs: &'b mut [Tensor<Blob>],
) -> Result<(&'a Tensor<Blob>, &'b mut Tensor<Blob>), KernelError> {
    let arity = (inputs.len(), outputs.len());
    match (inputs, outputs) {
        (&[input], [output]) => Ok((input, output)),
        _ => Err(KernelError::InvalidArgument(format!(
            "expect 1 input and 1 output, got {} and {}",
            arity.0, arity.1,
        ))),
    }
}

use crate::KernelKey;
use thiserror::Error;

#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum KernelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no kernel registered for {0}")]
    NotRegistered(KernelKey),
}

#[test]
fn test_display() {
    use crate::Backend;
    use tensor::DataType;

    let e = KernelError::InvalidArgument("Dimension ids must be non-negative.".into());
    assert_eq!(
        e.to_string(),
        "invalid argument: Dimension ids must be non-negative."
    );

    let e = KernelError::NotRegistered(KernelKey {
        schema: "ExpandDims",
        backend: Backend::Cpu,
        data_type: DataType::F16,
    });
    assert_eq!(
        e.to_string(),
        "no kernel registered for ExpandDims[CPU, float16]"
    );
}

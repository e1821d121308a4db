use crate::KernelError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// 调用算子时附带的属性，以 JSON 对象表示。
#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// 把属性解析为算子自己的参数结构。
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, KernelError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| KernelError::InvalidArgument(format!("bad attributes: {e}")))
    }
}

impl FromStr for Attributes {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match serde_json::from_str(s) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(KernelError::InvalidArgument(format!(
                "attributes must be a json object, got {other}"
            ))),
            Err(e) => Err(KernelError::InvalidArgument(format!("bad attributes: {e}"))),
        }
    }
}

#[test]
fn test() {
    #[derive(Deserialize)]
    struct Attrs {
        dims: Vec<i64>,
    }

    let attrs = Attributes::new().with("dims", vec![0, -1]);
    assert_eq!(attrs.parse::<Attrs>().unwrap().dims, [0, -1]);

    let attrs = r#"{"dims": [2, 0]}"#.parse::<Attributes>().unwrap();
    assert_eq!(attrs, Attributes::new().with("dims", vec![2, 0]));

    assert!(matches!(
        "[1, 2]".parse::<Attributes>(),
        Err(KernelError::InvalidArgument(_))
    ));
    assert!(matches!(
        Attributes::new().with("dims", "0").parse::<Attrs>(),
        Err(KernelError::InvalidArgument(_))
    ));
}

use std::collections::HashMap;
use std::convert::{TryFrom, TryInto};
use std::fmt::{Display, Formatter};
use smallvec::SmallVec;
use crate::Float;

/// A single named parameter value. Scalars are stored as one-element arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamVal {
    Int(SmallVec<[i32; 1]>),
    Float(SmallVec<[Float; 1]>),
    Bool(SmallVec<[bool; 1]>),
    String(SmallVec<[String; 1]>),
}

impl ParamVal {
    fn type_name(&self) -> &'static str {
        match self {
            ParamVal::Int(_) => "int",
            ParamVal::Float(_) => "float",
            ParamVal::Bool(_) => "bool",
            ParamVal::String(_) => "string",
        }
    }
}

#[derive(Debug)]
pub struct TryFromParamErr(pub &'static str);

/// Name of the parameter type a Rust type is read from, as reported in `ParamError`s.
pub trait ParamType {
    const TYPE_NAME: &'static str;
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamError {
    Missing {
        name: &'static str,
        expected_ty: &'static str,
    },
    WrongType {
        name: &'static str,
        expected_ty: &'static str,
    },
    InvalidValue {
        name: &'static str,
        value: String,
    },
    UnknownAccelerator(String),
}

impl Display for ParamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::Missing { name, expected_ty } => {
                write!(f, "missing parameter \"{}\" of type {}", name, expected_ty)
            }
            ParamError::WrongType { name, expected_ty } => {
                write!(f, "parameter \"{}\" should be of type {}", name, expected_ty)
            }
            ParamError::InvalidValue { name, value } => {
                write!(f, "invalid value {} for parameter \"{}\"", value, name)
            }
            ParamError::UnknownAccelerator(name) => write!(f, "unknown accelerator \"{}\"", name),
        }
    }
}

impl std::error::Error for ParamError {}

macro_rules! impl_basic_conversions {
    ($param_variant:ident, $into_ty:ty, $ty_name:expr) => {
        impl TryFrom<ParamVal> for $into_ty {
            type Error = TryFromParamErr;

            fn try_from(value: ParamVal) -> Result<Self, Self::Error> {
                match value {
                    ParamVal::$param_variant(v) => {
                        if v.len() == 1 {
                            v.into_iter().nth(0).ok_or(TryFromParamErr($ty_name))
                        } else {
                            Err(TryFromParamErr($ty_name))
                        }
                    },
                    _ => Err(TryFromParamErr($ty_name))
                }
            }
        }

        impl ParamType for $into_ty {
            const TYPE_NAME: &'static str = $ty_name;
        }

        impl From<Vec<$into_ty>> for ParamVal {
            fn from(value: Vec<$into_ty>) -> ParamVal {
                ParamVal::$param_variant(SmallVec::from_vec(value))
            }
        }

        impl From<$into_ty> for ParamVal {
            fn from(value: $into_ty) -> ParamVal {
                ParamVal::$param_variant(smallvec::smallvec![value])
            }
        }
    };
}

impl_basic_conversions!(Int, i32, "int");
impl_basic_conversions!(Float, Float, "float");
impl_basic_conversions!(Bool, bool, "bool");
impl_basic_conversions!(String, String, "string");

impl From<&str> for ParamVal {
    fn from(value: &str) -> Self {
        ParamVal::from(value.to_string())
    }
}

/// String-keyed parameter bag. Getters remove what they read so that anything left over can be
/// reported as unused.
#[derive(Clone, Debug, Default)]
pub struct ParamSet {
    params: HashMap<String, ParamVal>,
}

impl ParamSet {
    pub fn with(&mut self, name: &str, value: impl Into<ParamVal>) -> &mut Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn get_one<T>(&mut self, name: &'static str) -> Result<T, ParamError>
        where T: ParamType + TryFrom<ParamVal, Error=TryFromParamErr>
    {
        self.params.remove(name)
            .ok_or(ParamError::Missing { name, expected_ty: T::TYPE_NAME })?
            .try_into()
            .map_err(|e: TryFromParamErr| ParamError::WrongType { name, expected_ty: e.0 })
    }

    /// Like `get_one`, but a missing parameter is `Ok(None)`.
    pub fn get_optional<T>(&mut self, name: &'static str) -> Result<Option<T>, ParamError>
        where T: ParamType + TryFrom<ParamVal, Error=TryFromParamErr>
    {
        match self.params.remove(name) {
            None => Ok(None),
            Some(val) => val.try_into()
                .map(Some)
                .map_err(|e: TryFromParamErr| ParamError::WrongType { name, expected_ty: e.0 }),
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Names of the parameters nothing has read yet, sorted.
    pub fn unused(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.params.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn warn_unused(&self, context: &str) {
        for name in self.unused() {
            let ty = self.params.get(name).map_or("?", |v| v.type_name());
            tracing::warn!("Parameter \"{}\" ({}) unused by {}", name, ty, context);
        }
    }
}

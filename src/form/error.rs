use thiserror::Error;

use super::path::ParamPath;

/// Errors raised by argument form edits and conversion.
///
/// A failed operation never replaces the form it was called on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The ABI type string is not a supported Solidity type
    #[error("Unsupported Solidity type: {0}")]
    UnsupportedType(String),

    /// An edit path does not match the schema's shape at that point
    #[error("Schema mismatch at {path}: {reason}")]
    SchemaMismatch { path: ParamPath, reason: String },

    /// An array edit addresses a non-existent element
    #[error("Index {index} out of range at {path} (length {len})")]
    IndexOutOfRange {
        path: ParamPath,
        index: usize,
        len: usize,
    },

    /// A leaf could not be coerced into a call argument
    #[error("Cannot convert {value:?} at {path} to {ty}: {reason}")]
    ConversionError {
        path: ParamPath,
        value: String,
        ty: String,
        reason: String,
    },
}

impl FormError {
    pub fn mismatch(path: &ParamPath, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Path of the offending node, if the error has one.
    pub fn path(&self) -> Option<&ParamPath> {
        match self {
            Self::UnsupportedType(_) => None,
            Self::SchemaMismatch { path, .. }
            | Self::IndexOutOfRange { path, .. }
            | Self::ConversionError { path, .. } => Some(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_survives_anyhow() {
        let at: ParamPath = "orders.1.amount".parse().unwrap();
        let err = anyhow::Error::from(FormError::IndexOutOfRange {
            path: at.clone(),
            index: 3,
            len: 2,
        });
        let form_err = err.downcast_ref::<FormError>().unwrap();
        assert_eq!(form_err.path(), Some(&at));
        assert_eq!(FormError::UnsupportedType("fixed".into()).path(), None);
    }
}

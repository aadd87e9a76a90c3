use crate::interface::ValueTy;

pub type MarkerResult<T> = std::result::Result<T, MarkerError>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerError {
    /// A builder was registered under a name that is already taken. The
    /// original registration is left untouched.
    TemplateExists { template_name: String },
    /// `render` or `partial` referenced a name nothing was registered under.
    MissingTemplate { template_name: String },
    /// `each` was handed a value it cannot iterate. `expected` is then
    /// `ValueTy::List`, which stands for any iterable value: a list or a map.
    TypeMismatch { expected: ValueTy, found: ValueTy },
    /// Raised by a builder function or an `each` callback.
    RenderError { message: String },
}

impl MarkerError {
    /// Shorthand for raising a [`MarkerError::RenderError`] from builder code.
    pub fn render<T: Into<String>>(message: T) -> Self {
        Self::RenderError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for MarkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateExists { template_name } => {
                write!(f, "Template already exists: {}", template_name)
            }
            Self::MissingTemplate { template_name } => {
                write!(f, "Template not found: {}", template_name)
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {:?}, found {:?}", expected, found)
            }
            Self::RenderError { message } => {
                write!(f, "Rendering error: {}", message)
            }
        }
    }
}

impl std::error::Error for MarkerError {}

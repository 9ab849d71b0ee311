//! Errors for invalid command line input and configuration.

use std::{borrow::Cow, error::Error, fmt, fmt::Display};

/// A configuration or input error with a human readable message.
/// Reported to the user instead of a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliErr(pub Cow<'static, str>);

impl CliErr {
    pub fn new(msg: impl Into<Cow<'static, str>>) -> Self {
        CliErr(msg.into())
    }
}

impl Display for CliErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for CliErr {}

impl From<&'static str> for CliErr {
    fn from(msg: &'static str) -> Self {
        CliErr(Cow::Borrowed(msg))
    }
}

impl From<String> for CliErr {
    fn from(msg: String) -> Self {
        CliErr(Cow::Owned(msg))
    }
}

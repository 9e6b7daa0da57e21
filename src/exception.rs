use std::error::Error;
use std::fmt;

/// Captured exception attached to a [`LogEvent`](crate::event::LogEvent).
///
/// Exceptions form a chain through `inner`; the innermost link is the
/// *base* exception and supplies the message `type` and `source` fields,
/// while the full chain is rendered into the message `detail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Fully qualified type name, e.g. `std::num::ParseIntError`.
    pub type_name: String,
    pub message: String,
    /// Component that raised the exception.
    pub source: Option<String>,
    pub stack_trace: Option<String>,
    /// Extra key/value data carried by this exception.
    pub data: Vec<(String, String)>,
    pub inner: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
            source: None,
            stack_trace: None,
            data: Vec::new(),
            inner: None,
        }
    }

    pub fn with_inner(mut self, inner: ExceptionInfo) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    /// Capture a Rust error and its `source()` chain.
    ///
    /// `dyn Error` carries no type name, so the leading identifier of the
    /// `Debug` output is used (`ParseIntError { .. }` -> `ParseIntError`).
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut info = ExceptionInfo::new(debug_type_name(err), err.to_string());
        if let Some(source) = err.source() {
            info.inner = Some(Box::new(ExceptionInfo::from_error(source)));
        }
        info
    }

    /// Innermost exception of the chain.
    pub fn base(&self) -> &ExceptionInfo {
        let mut current = self;
        while let Some(inner) = current.inner.as_deref() {
            current = inner;
        }
        current
    }

    /// Outermost-first iterator over the chain.
    pub fn chain(&self) -> impl Iterator<Item = &ExceptionInfo> {
        std::iter::successors(Some(self), |e| e.inner.as_deref())
    }

    /// Type name without its module path.
    pub fn short_type_name(&self) -> &str {
        self.type_name
            .rsplit(|c: char| c == '.' || c == ':')
            .find(|s| !s.is_empty())
            .unwrap_or(&self.type_name)
    }

    /// Data of every exception in the chain, keys prefixed with the short
    /// type name of the exception that carries them.
    pub fn data_items(&self) -> Vec<(String, String)> {
        self.chain()
            .flat_map(|e| {
                let prefix = e.short_type_name();
                e.data
                    .iter()
                    .map(move |(k, v)| (format!("{}.{}", prefix, k), v.clone()))
            })
            .collect()
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(inner) = &self.inner {
            write!(f, " ---> {}", inner)?;
            f.write_str("\n   --- End of inner exception stack trace ---")?;
        }
        if let Some(trace) = &self.stack_trace {
            write!(f, "\n{}", trace)?;
        }
        Ok(())
    }
}

fn debug_type_name(err: &dyn Error) -> String {
    let debug = format!("{:?}", err);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        "Error".to_string()
    } else {
        name
    }
}

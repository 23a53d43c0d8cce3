/// A single request header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Ordered collection of request headers.
///
/// Arrival order is preserved and duplicate names are kept; `get` returns
/// the first match, which is the HTTP semantics this server relies on
/// (only `Content-Length` is ever looked up).
#[derive(Debug, Clone, Default)]
pub struct HeaderList {
    fields: Vec<Header>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Header {
            name: name.into(),
            value: value.into(),
        });
    }

    /// First value stored under `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.fields.iter()
    }
}

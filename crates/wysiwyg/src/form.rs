/// Receives the settled HTML each time the content changes.
pub trait ContentSink {
    fn write_content(&mut self, html: &str);
}

/// The hidden `<input>` the host form submits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenField {
    name: String,
    value: String,
    writes: usize,
}

impl HiddenField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            writes: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ContentSink for HiddenField {
    fn write_content(&mut self, html: &str) {
        self.writes += 1;
        html.clone_into(&mut self.value);
    }
}

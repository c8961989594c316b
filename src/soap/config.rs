use std::collections::BTreeMap;

/// Output options for an XML document
#[derive(Debug, Clone, Default)]
pub struct XmlConfig {
    pub pretty: bool,
    /// Prefix to URI, declared on the root element
    pub namespaces: BTreeMap<String, String>,
}

impl XmlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent nested elements. Default is compact output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Declare a namespace on the root element. An empty prefix sets the default namespace.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }
}

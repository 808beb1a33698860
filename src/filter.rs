// Interface selection: "eth0,wlan0" shows only those, "%lo,docker0" hides those.
// A trailing '*' turns an entry into a prefix match.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum InterfaceFilter {
    #[default]
    All,
    Only(Vec<String>),
    Hide(Vec<String>),
}

impl InterfaceFilter {
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        let (hide, list) = match spec.strip_prefix('%') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        match (names.is_empty(), hide) {
            (true, _) => InterfaceFilter::All,
            (false, true) => InterfaceFilter::Hide(names),
            (false, false) => InterfaceFilter::Only(names),
        }
    }

    pub fn is_visible(&self, interface: &str) -> bool {
        match self {
            InterfaceFilter::All => true,
            InterfaceFilter::Only(names) => names.iter().any(|p| matches(p, interface)),
            InterfaceFilter::Hide(names) => !names.iter().any(|p| matches(p, interface)),
        }
    }
}

fn matches(pattern: &str, interface: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => interface.starts_with(prefix),
        None => pattern == interface,
    }
}

impl From<String> for InterfaceFilter {
    fn from(spec: String) -> Self {
        InterfaceFilter::parse(&spec)
    }
}

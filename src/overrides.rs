/// Per-invocation overrides extracted from a free-text passthrough string.
///
/// The string is whatever the operator appended after the alias, so parsing
/// is lenient by contract: anything that is not one of the four recognized
/// flags is skipped without complaint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub server: Option<String>,
    pub context: Option<String>,
    pub cluster: Option<String>,
}

impl Overrides {
    /// Parse `raw` into the last-wins value of each recognized flag.
    ///
    /// Both `--flag=value` and `--flag value` spellings are accepted; the
    /// two-token form consumes the following token whatever it looks like.
    /// A trailing flag with no value left to consume is dropped.
    pub fn parse(raw: &str) -> Self {
        let mut overrides = Self::default();
        let mut tokens = raw.split_whitespace();

        while let Some(token) = tokens.next() {
            let (flag, value) = match token.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (token, None),
            };

            let slot = match flag {
                "--namespace" => &mut overrides.namespace,
                "--server" => &mut overrides.server,
                "--context" => &mut overrides.context,
                "--cluster" => &mut overrides.cluster,
                _ => continue,
            };

            match value.or_else(|| tokens.next().map(str::to_string)) {
                Some(value) => *slot = Some(value),
                None => break,
            }
        }

        overrides
    }

    /// True when no recognized flag was present.
    pub fn is_empty(&self) -> bool {
        self.namespace.is_none()
            && self.server.is_none()
            && self.context.is_none()
            && self.cluster.is_none()
    }
}

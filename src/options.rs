use serde::{Deserialize, Serialize};

/// Decoder settings.
///
/// Loadable from a job's config file; missing keys take the defaults
/// (`try_snappy` on, everything else off).
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackOptions {
    /// Leave message bodies undecoded
    pub raw: bool,
    /// Report every recovered error at `warn` and a summary at the end
    pub verbose: bool,
    /// Fail on the first framing or decode error
    pub strict: bool,
    /// After a decode error, rescan from just past the failed record's separator
    pub backtrack: bool,
    /// Attempt snappy decompression before decoding a body
    pub try_snappy: bool,
}

impl Default for UnpackOptions {
    fn default() -> UnpackOptions {
        UnpackOptions {
            raw: false,
            verbose: false,
            strict: false,
            backtrack: false,
            try_snappy: true,
        }
    }
}

impl UnpackOptions {
    /// Sets `raw`
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Sets `verbose`
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets `strict`
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets `backtrack`
    pub fn backtrack(mut self, backtrack: bool) -> Self {
        self.backtrack = backtrack;
        self
    }

    /// Sets `try_snappy`
    pub fn try_snappy(mut self, try_snappy: bool) -> Self {
        self.try_snappy = try_snappy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = UnpackOptions::default();
        assert!(opts.try_snappy);
        assert!(!opts.raw && !opts.verbose && !opts.strict && !opts.backtrack);
    }

    #[test]
    fn partial_config() {
        let opts: UnpackOptions = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert_eq!(UnpackOptions::default().strict(true), opts);
    }
}

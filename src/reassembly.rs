use std::collections::HashMap;

use crate::types::SourceKey;

/// Turns chunked stream text into complete lines, per source.
///
/// Each source keeps at most one pending fragment: the text after its last
/// newline. A fragment is only emitted once a later chunk terminates it.
#[derive(Debug, Default)]
pub struct LineReassembler {
    pending: HashMap<SourceKey, String>,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the lines it completed, in order.
    pub fn push(&mut self, source: &SourceKey, chunk: &str) -> Vec<String> {
        let buffer = self.pending.entry(source.clone()).or_default();
        buffer.push_str(chunk);

        let Some(last_newline) = buffer.rfind('\n') else {
            return Vec::new();
        };

        let rest = buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(buffer, rest);

        complete
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    #[cfg(test)]
    pub fn pending(&self, source: &SourceKey) -> Option<&str> {
        self.pending
            .get(source)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Drop every pending fragment. Called when a stream starts or ends.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pod: &str) -> SourceKey {
        SourceKey {
            namespace: "ns1".to_string(),
            pod: pod.to_string(),
            container: "app".to_string(),
        }
    }

    #[test]
    fn test_partial_chunks_join_into_one_line() {
        let mut r = LineReassembler::new();
        let k = key("web-0");
        assert!(r.push(&k, "hello ").is_empty());
        assert_eq!(r.push(&k, "world\n"), vec!["hello world"]);
        assert_eq!(r.push(&k, "next\n"), vec!["next"]);
        assert_eq!(r.pending(&k), None);
    }

    #[test]
    fn test_trailing_fragment_is_retained() {
        let mut r = LineReassembler::new();
        let k = key("web-0");
        let lines = r.push(&k, "a\nb\n\nc");
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(r.pending(&k), Some("c"));
        assert_eq!(r.push(&k, "d\n"), vec!["cd"]);
    }

    #[test]
    fn test_arbitrary_chunking_preserves_lines() {
        let text = "one\ntwo\n\nthree\nfour\npartial";
        for split in 1..text.len() {
            let mut r = LineReassembler::new();
            let k = key("web-0");
            let mut out = r.push(&k, &text[..split]);
            out.extend(r.push(&k, &text[split..]));
            assert_eq!(out, vec!["one", "two", "three", "four"], "split at {}", split);
            assert_eq!(r.pending(&k), Some("partial"));
        }
    }

    #[test]
    fn test_sources_are_independent() {
        let mut r = LineReassembler::new();
        let a = key("web-0");
        let b = key("web-1");
        assert!(r.push(&a, "from a").is_empty());
        assert_eq!(r.push(&b, "from b\n"), vec!["from b"]);
        assert_eq!(r.push(&a, "\n"), vec!["from a"]);
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut r = LineReassembler::new();
        let k = key("web-0");
        assert_eq!(r.push(&k, "line\r\n"), vec!["line"]);
    }

    #[test]
    fn test_reset_discards_fragments() {
        let mut r = LineReassembler::new();
        let k = key("web-0");
        r.push(&k, "dangling");
        r.reset();
        assert_eq!(r.pending(&k), None);
        assert_eq!(r.push(&k, "fresh\n"), vec!["fresh"]);
    }
}

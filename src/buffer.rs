/// Append-only accumulator for the downloaded payload.
/// The version counts appends and never decreases, so readers can tell
/// "how far along" the download is without diffing content.
#[derive(Debug, Default)]
pub struct DownloadBuffer {
    content: String,
    version: u64,
}

impl DownloadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// append one chunk and bump the version
    pub fn append(&mut self, chunk: &str) {
        self.content.push_str(chunk);
        self.version += 1;
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let buffer = DownloadBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(0, buffer.version());
    }

    #[test]
    fn test_append_accumulates_in_order() {
        let mut buffer = DownloadBuffer::new();
        buffer.append("Block1");
        buffer.append("Block2");
        assert_eq!("Block1Block2", buffer.content());
        assert_eq!(12, buffer.len());
        // one version bump per append
        assert_eq!(2, buffer.version());
    }
}

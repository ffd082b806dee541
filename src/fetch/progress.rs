//! Download progress tracking
//!
//! Progress is a plain value threaded through a download and handed back to
//! the caller, so concurrent or repeated fetches never share a counter.

/// Bytes received so far and the expected total, if the server announced one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    downloaded: u64,
    total: Option<u64>,
    reported_decile: u8,
}

impl DownloadProgress {
    /// Fresh progress with nothing downloaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the length of the body about to be streamed
    ///
    /// The total is relative to what was already counted, so one value can
    /// accumulate across several downloads.
    #[must_use]
    pub fn begin(mut self, content_length: Option<u64>) -> Self {
        self.total = content_length.map(|len| self.downloaded + len);
        self.reported_decile = self.percent().map_or(0, |p| (p / 10) as u8);
        self
    }

    /// Count `bytes` more. Returns the new 10% step when one was crossed.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.downloaded += bytes;
        let decile = (self.percent()? / 10).min(10) as u8;
        if decile > self.reported_decile {
            self.reported_decile = decile;
            Some(decile * 10)
        } else {
            None
        }
    }

    /// Bytes received so far
    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Expected total, when known
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Whole percent complete, when the total is known
    pub fn percent(&self) -> Option<u64> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(self.downloaded.saturating_mul(100) / total),
            None => None,
        }
    }

    /// True once the announced total has been reached
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.downloaded >= total)
    }
}

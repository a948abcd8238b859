use std::io::Write;

/// Tail sink that prints only what the accumulated text gained since the
/// last call.
pub(crate) struct LiveView<W: Write> {
    out: W,
    shown: usize,
}

impl<W: Write> LiveView<W> {
    pub(crate) const fn new(out: W) -> Self {
        Self { out, shown: 0 }
    }

    pub(crate) fn show(&mut self, text: &str) {
        let fresh = text.get(self.shown..).unwrap_or_default();
        if fresh.is_empty() {
            return;
        }
        if let Err(err) = self.out.write_all(fresh.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::debug!("Failed to echo worker log: {}", err);
        }
        self.shown = text.len();
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

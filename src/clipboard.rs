use anyhow::{Context, Result};
use arboard::Clipboard;

/// System clipboard handle held for the whole session. Some platforms drop
/// the copied text as soon as the owning handle goes away.
pub(crate) struct SessionClipboard {
    inner: Option<Clipboard>,
}

impl SessionClipboard {
    pub(crate) fn new() -> Self {
        Self { inner: None }
    }

    pub(crate) fn copy(&mut self, text: &str) -> Result<()> {
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new().context("failed to open clipboard")?,
        };
        let clipboard = self.inner.insert(clipboard);
        clipboard
            .set_text(text.to_string())
            .context("failed to copy to clipboard")
    }
}

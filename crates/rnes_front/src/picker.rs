//! Native ROM selection, kept off the UI thread so frames keep flowing while the dialog is open.
use std::path::PathBuf;

use anyhow::Context;
use crossbeam::channel::{Receiver, TryRecvError};

use crate::session::ROM_EXTENSION;

/// A file dialog running on its own thread.
#[derive(Default)]
pub struct RomPicker {
    pending: Option<Receiver<Option<PathBuf>>>,
}

impl RomPicker {
    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Show the native `.nes` picker.
    pub fn open(&mut self) -> anyhow::Result<()> {
        self.open_with(|| {
            let dialog = rfd::AsyncFileDialog::new()
                .set_title("Open ROM")
                .add_filter("NES ROM", &[ROM_EXTENSION])
                .pick_file();

            pollster::block_on(dialog).map(|handle| handle.path().to_path_buf())
        })
    }

    fn open_with(&mut self, pick: impl FnOnce() -> Option<PathBuf> + Send + 'static) -> anyhow::Result<()> {
        let (sender, receiver) = crossbeam::channel::bounded(1);

        std::thread::Builder::new()
            .name("File Picker".to_string())
            .spawn(move || {
                // The UI may have shut down in the meantime.
                let _ = sender.send(pick());
            })
            .context("Failed to start the file picker")?;

        self.pending = Some(receiver);

        Ok(())
    }

    /// The outcome of the open dialog once it closed, `Some(None)` if nothing was picked.
    pub fn poll(&mut self) -> Option<Option<PathBuf>> {
        let result = match self.pending.as_ref()?.try_recv() {
            Ok(path) => path,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("File picker closed without an answer");
                None
            }
        };

        self.pending = None;
        Some(result)
    }
}

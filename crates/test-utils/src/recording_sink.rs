use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use asyncrun::sink::OutputSink;

/// Output sink that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingSink {
    replaced: Mutex<Vec<(String, Vec<String>)>>,
    opened: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replaced(&self) -> Vec<(String, Vec<String>)> {
        self.replaced.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl OutputSink for RecordingSink {
    fn replace(&self, title: &str, lines: Vec<String>) {
        self.replaced
            .lock()
            .unwrap()
            .push((title.to_string(), lines));
    }

    fn open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }
}

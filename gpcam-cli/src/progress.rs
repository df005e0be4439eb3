use gpcam_lib::{DownloadObserver, MediaFile};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Two-bar renderer: overall queue progress plus the in-flight file.
pub struct ProgressRenderer {
    _bars: MultiProgress,
    overall: ProgressBar,
    current: ProgressBar,
    completed_bytes: u64,
}

impl ProgressRenderer {
    pub fn new(queue: &[MediaFile]) -> Self {
        let bars = MultiProgress::new();
        let total: u64 = queue.iter().map(|file| file.size).sum();

        let overall = bars.add(ProgressBar::new(total.max(1)));
        overall.set_style(
            ProgressStyle::with_template("{msg:>9} {bar:40.yellow} {percent:>3}%")
                .expect("static template"),
        );

        let current = bars.add(ProgressBar::new(1));
        current.set_style(
            ProgressStyle::with_template("{msg} {bar:24.cyan} {percent:>3}% [{bytes_per_sec}]")
                .expect("static template"),
        );

        Self {
            _bars: bars,
            overall,
            current,
            completed_bytes: 0,
        }
    }

    pub fn finish(&self) {
        self.current.finish_and_clear();
        self.overall.finish();
    }
}

impl DownloadObserver for ProgressRenderer {
    fn file_started(&mut self, index: usize, total_files: usize, file: &MediaFile) {
        self.overall
            .set_message(format!("[{}/{}]", index + 1, total_files));
        self.current.reset();
        self.current.set_length(file.size.max(1));
        self.current.set_message(file.name.clone());
    }

    fn chunk_transferred(&mut self, file_bytes: u64, _file_size: u64) {
        self.current.set_position(file_bytes);
        self.overall.set_position(self.completed_bytes + file_bytes);
    }

    fn file_finished(&mut self, completed_bytes: u64) {
        self.completed_bytes = completed_bytes;
        self.overall.set_position(completed_bytes);
    }
}

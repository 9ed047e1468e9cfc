use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use perfusion_core::pipeline::{PipelineStage, ProgressReporter};

/// Drives one progress bar per group from pipeline stage events.
pub struct BarReporter {
    bar: ProgressBar,
    label: String,
}

impl BarReporter {
    pub fn new(multi: &MultiProgress, label: impl Into<String>) -> Self {
        let bar = multi.add(ProgressBar::new(0));
        if let Ok(style) =
            ProgressStyle::default_bar().template("{prefix:>10} {msg:28} [{bar:30}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        let label = label.into();
        bar.set_prefix(label.clone());
        Self { bar, label }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.bar.set_message(stage.to_string());
        self.bar.set_length(total_items.unwrap_or(1) as u64);
        self.bar.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
    }
}

use log::info;

/// The label shown in the panel next to the indicator.
pub trait PanelLabel {
    /// `long` is the widest text the label should reserve room for.
    fn set_label(&mut self, short: &str, long: &str);
}

/// Panel that reports label changes through the log.
#[derive(Debug, Default)]
pub struct LogPanel {
    short: String,
    long: String,
}

impl LogPanel {
    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn long(&self) -> &str {
        &self.long
    }
}

impl PanelLabel for LogPanel {
    fn set_label(&mut self, short: &str, long: &str) {
        if self.short != short {
            info!("{}", short);
        }
        self.short = short.to_string();
        self.long = long.to_string();
    }
}

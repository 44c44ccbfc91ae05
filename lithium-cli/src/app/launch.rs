use std::process::Command;

use color_eyre::eyre::{Result, bail};
use lithium_core::TitleRecord;
use tracing::info;

/// Starts titles using the configured command template
pub struct Launcher {
    template: Option<String>,
}

impl Launcher {
    pub fn new(template: Option<String>) -> Self {
        Self { template }
    }

    /// Program and arguments for `record`, or None without a template
    pub fn command_line(&self, record: &TitleRecord) -> Option<Vec<String>> {
        let template = self.template.as_deref()?;
        let exe = record.executable.to_string_lossy();
        let folder = record.folder.to_string_lossy();
        let args: Vec<String> = template
            .split_whitespace()
            .map(|part| part.replace("{exe}", &exe).replace("{folder}", &folder))
            .collect();
        (!args.is_empty()).then_some(args)
    }

    /// Start the title; returns a status line for the UI
    pub fn launch(&self, record: &TitleRecord) -> Result<String> {
        let Some(args) = self.command_line(record) else {
            info!(title = %record.title, exe = %record.executable.display(), "no launch command configured");
            return Ok(format!("Would launch {}", record.executable.display()));
        };
        let Some((program, rest)) = args.split_first() else {
            bail!("empty launch command");
        };

        Command::new(program)
            .args(rest)
            .current_dir(&record.folder)
            .spawn()?;
        info!(title = %record.title, command = %args.join(" "), "launched title");
        Ok(format!("Launched {}", record.title))
    }
}

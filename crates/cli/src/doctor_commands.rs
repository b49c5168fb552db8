//! `lungscan doctor`: config validation and classifier setup checks.
//!
//! Prints a report with `[ok]`, `[warn]`, `[fail]` or `[info]` per item and
//! exits non-zero when anything failed.

use std::path::Path;

use {
    anyhow::Result,
    lungscan_config::{BackendKind, LungscanConfig, Severity},
    lungscan_inference::OnnxModel,
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Info => CYAN,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }

    fn count(&self, status: Status) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
        }
        eprintln!();
    }
    let errors = sections.iter().map(|s| s.count(Status::Fail)).sum();
    let warnings = sections.iter().map(|s| s.count(Status::Warn)).sum();
    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub fn handle_doctor(config: &LungscanConfig, explicit_path: Option<&Path>) -> Result<()> {
    eprintln!("{BOLD}lungscan doctor{RESET}");
    eprintln!("{BOLD}==============={RESET}\n");

    let sections = vec![
        check_config(config, explicit_path),
        check_classifier(config),
    ];
    let (errors, warnings) = print_report(&sections);

    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── 1. Config validation ────────────────────────────────────────────────────

fn check_config(config: &LungscanConfig, explicit_path: Option<&Path>) -> Section {
    let source = explicit_path
        .map(Path::to_path_buf)
        .or_else(lungscan_config::find_config_file)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".into());
    let mut section = Section::new(format!("Config ({source})"));

    let result = lungscan_config::validate(config, true);
    for d in &result.diagnostics {
        let status = match d.severity {
            Severity::Error => Status::Fail,
            Severity::Warning => Status::Warn,
        };
        section.push(status, format!("{}: {}", d.path, d.message));
    }
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "no issues found");
    }
    section
}

// ── 2. Classifier ───────────────────────────────────────────────────────────

fn check_classifier(config: &LungscanConfig) -> Section {
    let classifier = &config.classifier;
    let mut section = Section::new(format!("Classifier ({})", classifier.backend));
    section.push(
        Status::Info,
        format!("reply style: {:?}", classifier.effective_reply_style()),
    );

    match classifier.backend {
        BackendKind::Local => {
            section.push(
                Status::Info,
                format!("normalization: {}", classifier.local.normalization),
            );
            match classifier.local.model_path.as_deref() {
                Some(path) if path.is_file() => match OnnxModel::load(path) {
                    Ok(_) => section.push(Status::Ok, format!("model loads: {}", path.display())),
                    Err(e) => section.push(Status::Fail, e.to_string()),
                },
                Some(path) => {
                    section.push(Status::Fail, format!("model not found: {}", path.display()));
                },
                None => section.push(Status::Fail, "no model path configured"),
            }
        },
        BackendKind::Remote => match classifier.remote.endpoint.as_deref() {
            Some(endpoint) => {
                section.push(Status::Info, format!("endpoint: {endpoint}"));
                section.push(
                    Status::Info,
                    format!(
                        "timeout: {}s, jpeg quality: {}",
                        classifier.remote.timeout_secs, classifier.remote.jpeg_quality
                    ),
                );
            },
            None => section.push(Status::Fail, "no endpoint configured"),
        },
    }
    section
}

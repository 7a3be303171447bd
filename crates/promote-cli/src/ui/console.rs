//! Line-oriented console reporter.

use std::io::{IsTerminal, Stdout, Write};
use std::sync::{Mutex, PoisonError};

use crossterm::style::{Color, Stylize};
use promote_core::Reporter;
use promote_core::tree::ResolutionTree;
use promote_schema::PackageIdentity;

use super::theme::{Theme, packages};
use super::tree::render;

/// Prints progress as plain lines, colored when writing to a terminal.
#[derive(Debug)]
pub struct ConsoleReporter<W: Write + Send> {
    out: Mutex<W>,
    theme: Theme,
    color: bool,
    verbose: bool,
}

impl ConsoleReporter<Stdout> {
    /// Report to stdout. Color is used only on a terminal and when
    /// `NO_COLOR` is unset.
    pub fn stdout(verbose: bool) -> Self {
        let stdout = std::io::stdout();
        let color = stdout.is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::new(stdout, color, verbose)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, color: bool, verbose: bool) -> Self {
        Self {
            out: Mutex::new(out),
            theme: Theme::default(),
            color,
            verbose,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn package(&self, identity: &PackageIdentity) -> String {
        format!(
            "{} {}",
            self.paint(identity.id.as_str(), self.theme.colors.package_name),
            self.paint(&identity.version.to_string(), self.theme.colors.version)
        )
    }

    fn line(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    fn status(&self, icon: &str, color: Color, text: &str) {
        self.line(&format!("  {} {}", self.paint(icon, color), text));
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn section(&self, title: &str) {
        self.line("");
        self.line(&format!(
            "{} {}",
            title,
            self.paint(&"─".repeat(40), self.theme.colors.header)
        ));
    }

    fn resolving(&self, identity: &PackageIdentity) {
        if self.verbose {
            self.status(
                self.theme.icons.pending,
                self.theme.colors.secondary,
                &self.package(identity),
            );
        }
    }

    fn resolved(&self, tree: &ResolutionTree) {
        for line in render(tree) {
            self.line(&format!(
                "  {}{}{}",
                self.paint(&line.prefix, self.theme.colors.secondary),
                self.package(&line.identity),
                self.paint(&line.markers(), self.theme.colors.secondary)
            ));
        }
        let pending = tree.packages_to_promote().len();
        self.status(
            self.theme.icons.info,
            self.theme.colors.secondary,
            &format!("{} resolved, {} to promote", packages(tree.len()), pending),
        );
    }

    fn transferring(&self, identity: &PackageIdentity, index: usize, total: usize) {
        self.status(
            self.theme.icons.active,
            self.theme.colors.active,
            &format!("[{index}/{total}] {}", self.package(identity)),
        );
    }

    fn done(&self, identity: &PackageIdentity, detail: &str) {
        self.status(
            self.theme.icons.success,
            self.theme.colors.success,
            &format!("{} {}", self.package(identity), detail),
        );
    }

    fn failed(&self, identity: &PackageIdentity, reason: &str) {
        self.status(
            self.theme.icons.error,
            self.theme.colors.error,
            &format!("{} {}", self.package(identity), self.paint(reason, self.theme.colors.error)),
        );
    }

    fn info(&self, msg: &str) {
        self.status(self.theme.icons.info, self.theme.colors.secondary, msg);
    }

    fn warning(&self, msg: &str) {
        self.status(
            self.theme.icons.warning,
            self.theme.colors.warning,
            &self.paint(msg, self.theme.colors.warning),
        );
    }

    fn error(&self, msg: &str) {
        self.status(
            self.theme.icons.error,
            self.theme.colors.error,
            &self.paint(msg, self.theme.colors.error),
        );
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        self.line("");
        self.line(&format!(
            "{} {} {} in {:.1}s",
            self.paint(self.theme.icons.success, self.theme.colors.success),
            packages(count),
            action,
            elapsed_secs
        ));
    }
}

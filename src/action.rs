//! Host actions triggered by a fired gesture.
//!
//! Each action shells out to the platform's own tooling.  The detection
//! core only ever sees the `Action` trait.

use std::process::Command;

use clap::ValueEnum;
use tracing::{debug, info};

use crate::error::ActionError;

/// Something the session can do when a gesture fires.
pub trait Action {
    /// Short name for logs and status output.
    fn name(&self) -> &'static str;

    /// Run the action once.  Called synchronously on the frame loop thread.
    fn perform(&mut self) -> Result<(), ActionError>;
}

// ── Host command ───────────────────────────────────────────

/// A program invocation with fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HostCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run to completion and require a zero exit status.
    fn run(&self) -> Result<(), ActionError> {
        debug!("running {} {:?}", self.program, self.args);
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| ActionError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ActionError::ExitStatus {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }

    /// Start the program and return without waiting for it.
    fn spawn(&self) -> Result<(), ActionError> {
        debug!("spawning {} {:?}", self.program, self.args);
        Command::new(&self.program)
            .args(&self.args)
            .spawn()
            .map_err(|source| ActionError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(())
    }
}

// ── Lock screen ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LockScreen {
    pub command: HostCommand,
}

impl Default for LockScreen {
    fn default() -> Self {
        let command = if cfg!(target_os = "windows") {
            HostCommand::new("rundll32.exe", ["user32.dll,LockWorkStation"])
        } else if cfg!(target_os = "macos") {
            HostCommand::new("pmset", ["displaysleepnow"])
        } else {
            HostCommand::new("loginctl", ["lock-session"])
        };
        Self { command }
    }
}

impl Action for LockScreen {
    fn name(&self) -> &'static str {
        "lock-screen"
    }

    fn perform(&mut self) -> Result<(), ActionError> {
        info!("Locking screen");
        self.command.run()
    }
}

// ── Launch process ─────────────────────────────────────────

/// Starts a program without waiting for it.  Defaults to the calculator.
#[derive(Debug, Clone)]
pub struct LaunchProcess {
    pub command: HostCommand,
}

impl LaunchProcess {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            command: HostCommand::new(program, args),
        }
    }
}

impl Default for LaunchProcess {
    fn default() -> Self {
        let command = if cfg!(target_os = "windows") {
            HostCommand::new("calc.exe", Vec::<String>::new())
        } else if cfg!(target_os = "macos") {
            HostCommand::new("open", ["-a", "Calculator"])
        } else {
            HostCommand::new("gnome-calculator", Vec::<String>::new())
        };
        Self { command }
    }
}

impl Action for LaunchProcess {
    fn name(&self) -> &'static str {
        "launch"
    }

    fn perform(&mut self) -> Result<(), ActionError> {
        info!("Launching {}", self.command.program);
        self.command.spawn()
    }
}

// ── Notification ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ShowNotification {
    pub title: String,
    pub message: String,
}

impl Default for ShowNotification {
    fn default() -> Self {
        Self {
            title: "Gesture Detected!".to_string(),
            message: "Fist gesture was detected.".to_string(),
        }
    }
}

impl ShowNotification {
    /// Platform command that displays this notification.
    pub fn command(&self) -> HostCommand {
        if cfg!(target_os = "windows") {
            HostCommand::new("msg", ["*".to_string(), format!("{}: {}", self.title, self.message)])
        } else if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                escape_applescript(&self.message),
                escape_applescript(&self.title),
            );
            HostCommand::new("osascript", ["-e".to_string(), script])
        } else {
            HostCommand::new("notify-send", [self.title.clone(), self.message.clone()])
        }
    }
}

impl Action for ShowNotification {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn perform(&mut self) -> Result<(), ActionError> {
        info!("Notification: {}", self.title);
        self.command().run()
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ── Shutdown ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Shutdown {
    pub command: HostCommand,
}

impl Default for Shutdown {
    fn default() -> Self {
        let command = if cfg!(target_os = "windows") {
            HostCommand::new("shutdown", ["/s", "/f", "/t", "0"])
        } else {
            HostCommand::new("shutdown", ["-h", "now"])
        };
        Self { command }
    }
}

impl Action for Shutdown {
    fn name(&self) -> &'static str {
        "shutdown"
    }

    fn perform(&mut self) -> Result<(), ActionError> {
        info!("Shutting down host");
        self.command.run()
    }
}

// ── Dry run ────────────────────────────────────────────────

/// Logs the wrapped action instead of performing it.
pub struct DryRun {
    pub inner: Box<dyn Action>,
    /// Number of times the wrapped action would have run.
    pub count: u64,
}

impl DryRun {
    pub fn new(inner: Box<dyn Action>) -> Self {
        Self { inner, count: 0 }
    }
}

impl Action for DryRun {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn perform(&mut self) -> Result<(), ActionError> {
        self.count += 1;
        info!("[dry-run] would perform {}", self.inner.name());
        Ok(())
    }
}

// ── Selection ──────────────────────────────────────────────

/// Action selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionKind {
    LockScreen,
    Launch,
    Notify,
    Shutdown,
}

impl ActionKind {
    /// Build the action.  `command` overrides the program for `Launch`
    /// and is ignored otherwise.
    pub fn build(&self, command: &[String]) -> Box<dyn Action> {
        match self {
            Self::LockScreen => Box::new(LockScreen::default()),
            Self::Launch => match command.split_first() {
                Some((program, args)) => Box::new(LaunchProcess::new(program, args.to_vec())),
                None => Box::new(LaunchProcess::default()),
            },
            Self::Notify => Box::new(ShowNotification::default()),
            Self::Shutdown => Box::new(Shutdown::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_names() {
        assert_eq!(ActionKind::LockScreen.build(&[]).name(), "lock-screen");
        assert_eq!(ActionKind::Launch.build(&[]).name(), "launch");
        assert_eq!(ActionKind::Notify.build(&[]).name(), "notify");
        assert_eq!(ActionKind::Shutdown.build(&[]).name(), "shutdown");
    }

    #[test]
    fn test_launch_command_override() {
        let action = LaunchProcess::new("xterm", vec!["-hold".to_string()]);
        assert_eq!(action.command.program, "xterm");
        assert_eq!(action.command.args, vec!["-hold"]);
    }

    #[test]
    fn test_notification_defaults() {
        let n = ShowNotification::default();
        assert_eq!(n.title, "Gesture Detected!");
        let cmd = n.command();
        assert!(cmd.args.iter().any(|a| a.contains("Fist gesture was detected.")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_commands() {
        assert_eq!(
            LockScreen::default().command,
            HostCommand::new("loginctl", ["lock-session"])
        );
        assert_eq!(
            Shutdown::default().command,
            HostCommand::new("shutdown", ["-h", "now"])
        );
        assert_eq!(ShowNotification::default().command().program, "notify-send");
    }

    #[test]
    fn test_dry_run_never_executes() {
        let mut dry = DryRun::new(Box::new(Shutdown::default()));
        assert_eq!(dry.name(), "shutdown");
        dry.perform().unwrap();
        dry.perform().unwrap();
        assert_eq!(dry.count, 2);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut action = LaunchProcess::new("gesture-trigger-no-such-program", Vec::new());
        let err = action.perform().unwrap_err();
        assert!(matches!(err, ActionError::Spawn { .. }));
    }

    #[test]
    fn test_escape_applescript() {
        assert_eq!(escape_applescript("a \"b\""), "a \\\"b\\\"");
    }
}

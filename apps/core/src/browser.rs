use std::fmt::{Display, Formatter};
use std::process::Stdio;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    EmptyUrl,
    UnsupportedScheme(String),
    Spawn(String),
}

impl Display for LaunchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "empty url"),
            Self::UnsupportedScheme(url) => write!(f, "refusing to open non-web url: {url}"),
            Self::Spawn(error) => write!(f, "failed to start browser: {error}"),
        }
    }
}

impl std::error::Error for LaunchError {}

/// Fire-and-forget navigation to an external resource.
pub trait UrlOpener {
    fn open(&mut self, url: &str) -> Result<(), LaunchError>;
}

pub fn validate_url(url: &str) -> Result<&str, LaunchError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::EmptyUrl);
    }
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(LaunchError::UnsupportedScheme(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Hands the URL to the desktop's default browser.
///
/// The helper process is reaped on the tokio runtime, so `open` returns as
/// soon as it has been started.
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser {
    launcher: Option<(String, Vec<String>)>,
}

impl SystemBrowser {
    /// Uses `program args.. <url>` instead of the platform opener.
    pub fn with_launcher(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            launcher: Some((
                program.into(),
                args.iter().map(|arg| arg.to_string()).collect(),
            )),
        }
    }

    fn command(&self, target: &str) -> tokio::process::Command {
        match &self.launcher {
            Some((program, args)) => {
                let mut command = tokio::process::Command::new(program);
                command.args(args).arg(target);
                command
            }
            None => platform_command(target),
        }
    }
}

impl UrlOpener for SystemBrowser {
    fn open(&mut self, url: &str) -> Result<(), LaunchError> {
        let target = validate_url(url)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| LaunchError::Spawn(error.to_string()))?;
        let mut child = self
            .command(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| LaunchError::Spawn(error.to_string()))?;

        let target = target.to_string();
        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => tracing::warn!("opener for {target} exited with {status}"),
                Err(error) => tracing::warn!("failed to reap opener for {target}: {error}"),
            }
        });
        Ok(())
    }
}

#[cfg(target_os = "windows")]
fn platform_command(target: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("cmd");
    command.arg("/C").arg("start").arg("").arg(target);
    command
}

#[cfg(target_os = "macos")]
fn platform_command(target: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("open");
    command.arg(target);
    command
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_command(target: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("xdg-open");
    command.arg(target);
    command
}

/// Records URLs instead of opening them.
#[derive(Debug, Default, Clone)]
pub struct RecordingOpener {
    pub opened: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

impl UrlOpener for RecordingOpener {
    fn open(&mut self, url: &str) -> Result<(), LaunchError> {
        let target = validate_url(url)?;
        self.opened.borrow_mut().push(target.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_url, LaunchError, RecordingOpener, SystemBrowser, UrlOpener};
    use std::time::{Duration, Instant};

    #[test]
    fn rejects_empty_and_non_web_urls() {
        assert_eq!(validate_url("  "), Err(LaunchError::EmptyUrl));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(LaunchError::UnsupportedScheme(_))
        ));
        assert_eq!(validate_url(" https://a.b "), Ok("https://a.b"));
    }

    #[test]
    fn recording_opener_keeps_history_shared() {
        let mut opener = RecordingOpener::default();
        let view = opener.clone();
        opener.open("https://duckduckgo.com/search?q=x").unwrap();
        assert_eq!(view.opened.borrow().as_slice(), ["https://duckduckgo.com/search?q=x"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_returns_before_the_opener_exits() {
        let mut browser = SystemBrowser::with_launcher("sh", &["-c", "sleep 3", "opener"]);
        let started = Instant::now();
        browser.open("https://example.com").unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn missing_opener_is_a_spawn_error() {
        let mut browser = SystemBrowser::with_launcher("rudolph-no-such-opener", &[]);
        assert!(matches!(
            browser.open("https://example.com"),
            Err(LaunchError::Spawn(_))
        ));
    }

    #[test]
    fn opening_outside_a_runtime_is_an_error() {
        let mut browser = SystemBrowser::with_launcher("true", &[]);
        assert!(matches!(
            browser.open("https://example.com"),
            Err(LaunchError::Spawn(_))
        ));
    }
}

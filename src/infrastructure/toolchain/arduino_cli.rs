use crate::domain::error::{SerialRwError, SerialRwResult};
use crate::infrastructure::toolchain::prompt::Prompter;
use crate::infrastructure::toolchain::runner::CommandRunner;
use std::time::Duration;
use tracing::{debug, info, warn};

const TOOL: &str = "arduino-cli";
const INSTALL_DOCS: &str = "https://arduino.github.io/arduino-cli/installation/";

/// Host operating system family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Linux,
    Windows,
    Other(String),
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Package managers that can install arduino-cli
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Brew,
    AptGet,
    Choco,
}

impl PackageManager {
    /// The manager expected on `os`
    pub fn for_os(os: &HostOs) -> Option<Self> {
        match os {
            HostOs::MacOs => Some(Self::Brew),
            HostOs::Linux => Some(Self::AptGet),
            HostOs::Windows => Some(Self::Choco),
            HostOs::Other(_) => None,
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Self::Brew => "brew",
            Self::AptGet => "apt-get",
            Self::Choco => "choco",
        }
    }

    /// Program and arguments that install arduino-cli
    pub fn install_command(&self) -> (&'static str, Vec<&'static str>) {
        match self {
            Self::Brew => ("brew", vec!["install", TOOL]),
            Self::AptGet => ("sudo", vec!["apt-get", "install", TOOL]),
            Self::Choco => ("choco", vec!["install", TOOL]),
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// What `ensure_installed` ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    AlreadyInstalled { version: String },
    Installed { manager: PackageManager },
    /// The user chose not to look for an automatic install
    Skipped { recommendation: Option<String> },
    NoPackageManager { expected: Option<PackageManager>, recommendation: Option<String> },
    Declined { manager: PackageManager, recommendation: Option<String> },
}

/// Detects and installs the arduino-cli companion tool.
///
/// One instance per process; it caches the detected package manager and
/// remembers whether installation advice was already shown.
pub struct ArduinoCli<R: CommandRunner, P: Prompter> {
    runner: R,
    prompter: P,
    os: HostOs,
    prompt_timeout: Duration,
    package_manager: Option<Option<PackageManager>>,
    recommendation_given: bool,
}

impl<R: CommandRunner, P: Prompter> ArduinoCli<R, P> {
    pub fn new(runner: R, prompter: P) -> Self {
        Self::with_os(runner, prompter, HostOs::current())
    }

    pub fn with_os(runner: R, prompter: P, os: HostOs) -> Self {
        Self {
            runner,
            prompter,
            os,
            prompt_timeout: Duration::from_secs(10),
            package_manager: None,
            recommendation_given: false,
        }
    }

    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Version string reported by `arduino-cli --version`, if it runs
    pub async fn installed_version(&self) -> Option<String> {
        match self.runner.output(TOOL, &["--version"]).await {
            Ok(output) if output.success => {
                let version = output.stdout.trim().to_string();
                debug!("{} version: {}", TOOL, version);
                Some(version)
            }
            Ok(output) => {
                warn!("'{}' is installed but returned an error: {}", TOOL, output.stderr.trim());
                None
            }
            Err(e) => {
                debug!("'{}' is not installed: {}", TOOL, e);
                None
            }
        }
    }

    pub async fn is_installed(&self) -> bool {
        self.installed_version().await.is_some()
    }

    /// The expected package manager for this OS if it is available; the
    /// answer is cached.
    pub async fn package_manager(&mut self) -> Option<PackageManager> {
        if let Some(cached) = self.package_manager {
            return cached;
        }

        let detected = match PackageManager::for_os(&self.os) {
            Some(manager) => match self.runner.output(manager.program(), &["--version"]).await {
                Ok(output) if output.success => Some(manager),
                _ => {
                    info!("Unable to find expected package manager '{}'", manager);
                    None
                }
            },
            None => {
                info!("Unrecognized operating system {:?}", self.os);
                None
            }
        };

        self.package_manager = Some(detected);
        detected
    }

    /// Manual installation instructions for this OS
    pub fn recommendation_text(&self) -> String {
        match &self.os {
            HostOs::MacOs => format!(
                "To install {TOOL} on macOS, run:\n    brew install {TOOL}\n\nOr see {INSTALL_DOCS}#macos"
            ),
            HostOs::Linux => format!(
                "To install {TOOL} on Linux, run:\n    curl -fsSL https://raw.githubusercontent.com/arduino/arduino-cli/master/install.sh | sh\n\nOr see {INSTALL_DOCS}#linux"
            ),
            HostOs::Windows => format!(
                "To install {TOOL} on Windows, download it from {INSTALL_DOCS}#windows\n\nOr, with Chocolatey:\n    choco install {TOOL}"
            ),
            HostOs::Other(name) => format!(
                "Unrecognized operating system {name}. See {INSTALL_DOCS}"
            ),
        }
    }

    /// Installation advice. Given unasked the first time; afterwards only if
    /// the user wants to see it again.
    pub async fn recommend(&mut self) -> Option<String> {
        if self.recommendation_given {
            let again = self
                .prompter
                .confirm(&format!("Show how to install {TOOL} again?"), self.prompt_timeout)
                .await;
            if !again {
                return None;
            }
        }

        self.recommendation_given = true;
        Some(self.recommendation_text())
    }

    /// Install arduino-cli if it is missing and the user agrees
    pub async fn ensure_installed(&mut self) -> SerialRwResult<InstallOutcome> {
        if let Some(version) = self.installed_version().await {
            return Ok(InstallOutcome::AlreadyInstalled { version });
        }

        let check = self
            .prompter
            .confirm(
                &format!("'{TOOL}' is not installed. Check for automatic installation?"),
                self.prompt_timeout,
            )
            .await;
        if !check {
            let recommendation = self.recommend().await;
            return Ok(InstallOutcome::Skipped { recommendation });
        }

        let Some(manager) = self.package_manager().await else {
            let expected = PackageManager::for_os(&self.os);
            let recommendation = self.recommend().await;
            return Ok(InstallOutcome::NoPackageManager { expected, recommendation });
        };

        let consent = self
            .prompter
            .confirm(&format!("Install {TOOL} using {manager}?"), self.prompt_timeout)
            .await;
        if !consent {
            let recommendation = self.recommend().await;
            return Ok(InstallOutcome::Declined { manager, recommendation });
        }

        info!("Installing {} via {}", TOOL, manager);
        let (program, args) = manager.install_command();
        match self.runner.interactive(program, &args).await {
            Ok(true) => Ok(InstallOutcome::Installed { manager }),
            Ok(false) => Err(SerialRwError::Tool {
                message: format!("installation using {} failed", manager),
            }),
            Err(e) => Err(SerialRwError::Tool {
                message: format!("could not run {}: {}", program, e),
            }),
        }
    }
}

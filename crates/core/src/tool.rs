//! The fixed catalog of third-party OSINT tools.

use crate::identifier::IdentifierKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a supported tool.
///
/// The set is closed: new tools are added here, never discovered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    /// Username search across social networks
    Sherlock,
    /// Username dossier builder
    Maigret,
    /// Email registration checks
    Holehe,
    /// Google account investigation
    Ghunt,
    /// Username enumeration from the WhatsMyName list
    WhatsMyName,
    /// Username search
    Blackbird,
    /// Phone number recovery from reset pages
    Email2Phone,
    /// Dark web search API
    DarkSearch,
}

impl ToolName {
    /// Every tool, in catalog order.
    pub const ALL: [ToolName; 8] = [
        ToolName::Sherlock,
        ToolName::Maigret,
        ToolName::Holehe,
        ToolName::Ghunt,
        ToolName::WhatsMyName,
        ToolName::Blackbird,
        ToolName::Email2Phone,
        ToolName::DarkSearch,
    ];

    /// Config and report key for this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Sherlock => "sherlock",
            ToolName::Maigret => "maigret",
            ToolName::Holehe => "holehe",
            ToolName::Ghunt => "ghunt",
            ToolName::WhatsMyName => "whatsmyname",
            ToolName::Blackbird => "blackbird",
            ToolName::Email2Phone => "email2phone",
            ToolName::DarkSearch => "darksearch",
        }
    }

    /// Static description of this tool.
    pub fn descriptor(&self) -> &'static ToolDescriptor {
        CATALOG
            .iter()
            .find(|d| d.name == *self)
            .unwrap_or(&CATALOG[0])
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tool: {}", s))
    }
}

/// Program a process-based tool is started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    /// The virtualenv's Python interpreter
    VenvPython,
    /// A program resolved through PATH
    Named(&'static str),
}

/// How a tool is launched.
///
/// Argument templates may contain `{target}` (the identifier value the tool
/// consumes), `{email}`, `{username}`, `{timeout}` (seconds) and `{tool_dir}`
/// (the tool's checkout directory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Spawn a process in the tool's checkout
    Process {
        /// Executable
        program: Program,
        /// Argument templates
        args: &'static [&'static str],
    },
    /// Query a remote search API over HTTP
    HttpSearch,
}

/// Container invocation used when a tool is configured with `docker_required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLaunch {
    /// Image to run
    pub image: &'static str,
    /// Arguments passed after the image name
    pub args: &'static [&'static str],
}

/// Static description of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Tool name
    pub name: ToolName,

    /// Git repository to provision from (`None` for remote-only tools)
    pub repo_url: Option<&'static str>,

    /// Launch procedure
    pub launch: Launch,

    /// Alternative container launch
    pub container: Option<ContainerLaunch>,

    /// Identifier the tool consumes
    pub input: IdentifierKind,

    /// Enabled in the built-in configuration
    pub enabled_by_default: bool,

    /// Timeout (seconds) in the built-in configuration
    pub default_timeout: Option<u64>,

    /// Container required in the built-in configuration
    pub docker_by_default: bool,
}

/// All supported tools.
pub static CATALOG: [ToolDescriptor; 8] = [
    ToolDescriptor {
        name: ToolName::Sherlock,
        repo_url: Some("https://github.com/sherlock-project/sherlock.git"),
        launch: Launch::Process {
            program: Program::VenvPython,
            args: &["-m", "sherlock_project", "{target}", "--print-found"],
        },
        container: None,
        input: IdentifierKind::Username,
        enabled_by_default: true,
        default_timeout: Some(15),
        docker_by_default: false,
    },
    ToolDescriptor {
        name: ToolName::Maigret,
        repo_url: Some("https://github.com/soxoj/maigret.git"),
        launch: Launch::Process {
            program: Program::VenvPython,
            args: &["-m", "maigret", "{target}"],
        },
        container: None,
        input: IdentifierKind::Username,
        enabled_by_default: true,
        default_timeout: Some(15),
        docker_by_default: false,
    },
    ToolDescriptor {
        name: ToolName::Holehe,
        repo_url: Some("https://github.com/megadose/holehe.git"),
        launch: Launch::Process {
            program: Program::VenvPython,
            args: &["-m", "holehe.core", "{target}", "--only-used"],
        },
        container: None,
        input: IdentifierKind::Email,
        enabled_by_default: true,
        default_timeout: Some(10),
        docker_by_default: false,
    },
    ToolDescriptor {
        name: ToolName::Ghunt,
        repo_url: Some("https://github.com/mxrch/GHunt.git"),
        launch: Launch::Process {
            program: Program::VenvPython,
            args: &["main.py", "email", "{target}"],
        },
        container: Some(ContainerLaunch {
            image: "mxrch/ghunt",
            args: &["ghunt", "email", "{target}"],
        }),
        input: IdentifierKind::Email,
        enabled_by_default: true,
        default_timeout: None,
        docker_by_default: true,
    },
    ToolDescriptor {
        name: ToolName::WhatsMyName,
        repo_url: Some("https://github.com/WebBreacher/WhatsMyName.git"),
        launch: Launch::Process {
            program: Program::VenvPython,
            args: &["web_accounts_list_checker.py", "-u", "{target}"],
        },
        container: None,
        input: IdentifierKind::Username,
        enabled_by_default: true,
        default_timeout: None,
        docker_by_default: false,
    },
    ToolDescriptor {
        name: ToolName::Blackbird,
        repo_url: Some("https://github.com/p1ngul1n0/blackbird.git"),
        launch: Launch::Process {
            program: Program::VenvPython,
            args: &["blackbird.py", "-u", "{target}"],
        },
        container: None,
        input: IdentifierKind::Username,
        enabled_by_default: true,
        default_timeout: None,
        docker_by_default: false,
    },
    ToolDescriptor {
        name: ToolName::Email2Phone,
        repo_url: Some("https://github.com/martinvigo/email2phonenumber.git"),
        launch: Launch::Process {
            program: Program::VenvPython,
            args: &["email2phonenumber.py", "scrape", "-e", "{target}"],
        },
        container: None,
        input: IdentifierKind::Email,
        enabled_by_default: false,
        default_timeout: None,
        docker_by_default: false,
    },
    ToolDescriptor {
        name: ToolName::DarkSearch,
        repo_url: None,
        launch: Launch::HttpSearch,
        container: None,
        input: IdentifierKind::Any,
        enabled_by_default: false,
        default_timeout: None,
        docker_by_default: false,
    },
];

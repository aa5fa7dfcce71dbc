//! CCTray feed model and XML encoding
//!
//! The feed format is the tag-attribute XML document consumed by build
//! status dashboards such as CCMenu and cc_dashboard: a `<Projects>` root
//! with one `<Project>` element per reported unit.
//!
//! Format summary: <https://github.com/robertmaldon/cc_dashboard#summary>

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

/// Whether a reported unit is currently executing or idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The project is currently building.
    Building,
    /// The project is idle.
    Sleeping,
    /// The project is checking for modifications.
    ///
    /// Part of the shared feed vocabulary; never produced by this tool's
    /// translator, only by other feed producers.
    CheckingModifications,
}

impl Activity {
    /// The canonical feed spelling of this activity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "Building",
            Self::Sleeping => "Sleeping",
            Self::CheckingModifications => "CheckingModifications",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome classification of the most recent build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The most recent build succeeded.
    Success,
    /// The most recent build failed.
    Failure,
    /// The most recent build aborted abnormally.
    ///
    /// In the shared vocabulary but never produced by this tool's
    /// translator.
    Exception,
    /// No build outcome has been recorded.
    Unknown,
}

impl BuildStatus {
    /// The canonical feed spelling of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::Exception => "Exception",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported unit in the feed, serialized as a `<Project>` element.
///
/// A value object: no identity beyond its fields, no mutation after
/// creation. Instances live only for one translate-and-encode pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Unique name of the reported unit within one feed document.
    pub name: String,
    /// Current activity of the unit.
    pub activity: Activity,
    /// Outcome of the most recent build.
    pub last_build_status: BuildStatus,
    /// When the most recent build activity happened.
    pub last_build_time: DateTime<Utc>,
    /// Label of the most recent build, if any. Omitted from the document
    /// when unset.
    pub last_build_label: Option<String>,
    /// When the next build is expected, if known. Omitted from the
    /// document when unset.
    pub next_build_time: Option<DateTime<Utc>>,
    /// Link to the unit's detail page. Always emitted, even when empty.
    pub web_url: String,
}

/// Format a feed timestamp as RFC 3339 with second precision.
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Encode projects as a compact feed document.
///
/// Projects are emitted in input order; the encoder imposes no sorting.
/// Output is byte-stable for a given input: no XML declaration, no
/// whitespace, attributes in a fixed order, optional attributes omitted
/// entirely when unset. Dashboard consumers are known to substring-match
/// the document, so the exact shape matters.
pub fn encode(projects: &[Project]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Start(BytesStart::new("Projects")))
        .context("unable to encode feed document")?;

    for project in projects {
        let mut element = BytesStart::new("Project");
        element.push_attribute(("name", project.name.as_str()));
        element.push_attribute(("activity", project.activity.as_str()));
        element.push_attribute(("lastBuildStatus", project.last_build_status.as_str()));
        element.push_attribute(("lastBuildTime", format_time(project.last_build_time).as_str()));
        element.push_attribute(("webUrl", project.web_url.as_str()));
        if let Some(label) = &project.last_build_label {
            element.push_attribute(("lastBuildLabel", label.as_str()));
        }
        if let Some(next) = project.next_build_time {
            element.push_attribute(("nextBuildTime", format_time(next).as_str()));
        }

        writer
            .write_event(Event::Start(element))
            .context("unable to encode feed document")?;
        writer
            .write_event(Event::End(BytesEnd::new("Project")))
            .context("unable to encode feed document")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Projects")))
        .context("unable to encode feed document")?;

    Ok(writer.into_inner())
}

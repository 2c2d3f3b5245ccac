use std::path::{
    Path,
    PathBuf,
};

use color_eyre::eyre::{
    WrapErr,
    eyre,
};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::{
    Error,
    args::{
        Args,
        DcOffset,
        Gain,
    },
    control::Command,
    util::Frequency,
};

/// Receiver settings loaded from a TOML file.
///
/// ```toml
/// frequency = "100M"
/// sample_rate = 2048000
/// bandwidth = "1.536M"
/// gain = "auto"
/// dc_offset = "auto"
/// chunk_size = 16384
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverProfile {
    pub sample_rate: Option<Frequency>,
    pub frequency: Option<Frequency>,
    pub bandwidth: Option<Frequency>,
    pub gain: Option<Gain>,
    pub dc_offset: Option<DcOffset>,
    pub chunk_size: Option<usize>,
}

impl ReceiverProfile {
    pub fn default_path() -> Result<PathBuf, Error> {
        let project_dirs = ProjectDirs::from("", "rsp", "rsp-cli")
            .ok_or_else(|| eyre!("Could not determine project directories"))?;
        Ok(project_dirs.config_dir().join("receiver.toml"))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading receiver profile");

        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Could not read profile {}", path.display()))?;
        toml::from_str(&text)
            .wrap_err_with(|| format!("Invalid profile {}", path.display()))
    }

    /// Loads the profile at `path`, or from the default location if it
    /// exists there.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            return Self::from_path(path);
        }

        match Self::default_path() {
            Ok(path) if path.exists() => Self::from_path(path),
            Ok(_) => Ok(Self::default()),
            Err(error) => {
                tracing::debug!(%error, "No default profile");
                Ok(Self::default())
            }
        }
    }

    /// Overrides profile settings with the ones given on the command line.
    pub fn merge(self, args: &Args) -> Self {
        Self {
            sample_rate: args.sample_rate.or(self.sample_rate),
            frequency: args.frequency.or(self.frequency),
            bandwidth: args.bandwidth.or(self.bandwidth),
            gain: args.gain.or(self.gain),
            dc_offset: args.dc_offset.or(self.dc_offset),
            chunk_size: args.chunk_size.or(self.chunk_size),
        }
    }

    /// The commands that apply this profile to a receiver.
    pub fn commands(&self) -> Vec<Command> {
        [
            self.sample_rate.map(Command::SampleRate),
            self.frequency.map(Command::Frequency),
            self.bandwidth.map(Command::Bandwidth),
            self.gain.map(Command::Gain),
            self.dc_offset.map(Command::DcOffset),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

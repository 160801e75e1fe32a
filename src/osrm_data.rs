//! Local OSRM dataset preparation for long-haul routing.
//!
//! Downloads a Geofabrik extract and runs the `osrm-backend` docker image to
//! preprocess it, so an `osrm-routed` instance can serve `/route` requests
//! for [`crate::osrm::OsrmClient`]. Each step is skipped when its output
//! already exists.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

const OSRM_IMAGE: &str = "osrm/osrm-backend";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("extract download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("osrm preprocessing failed: {0}")]
    ProcessFailure(String),
}

/// A Geofabrik extract, e.g. `north-america/us/arizona`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub path: String,
}

impl Region {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("region")
    }

    pub fn download_url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path)
    }
}

/// Which OSRM routing algorithm the dataset is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Multi-level Dijkstra: partition + customize.
    Mld,
    /// Contraction hierarchies: contract.
    Ch,
}

impl Algorithm {
    /// Value for `osrm-routed --algorithm`.
    pub fn flag(self) -> &'static str {
        match self {
            Algorithm::Mld => "mld",
            Algorithm::Ch => "ch",
        }
    }

    fn steps(self) -> &'static [PrepStep] {
        match self {
            Algorithm::Mld => &[PrepStep::Partition, PrepStep::Customize],
            Algorithm::Ch => &[PrepStep::Contract],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrepStep {
    Partition,
    Customize,
    Contract,
}

impl PrepStep {
    fn tool(self) -> &'static str {
        match self {
            PrepStep::Partition => "osrm-partition",
            PrepStep::Customize => "osrm-customize",
            PrepStep::Contract => "osrm-contract",
        }
    }

    /// Files the step leaves next to the `.osrm` base.
    fn outputs(self) -> &'static [&'static str] {
        match self {
            PrepStep::Partition => &["osrm.partition", "osrm.cells"],
            PrepStep::Customize => &["osrm.mldgr"],
            PrepStep::Contract => &["osrm.hsgr"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub region: Region,
    pub data_root: PathBuf,
    pub algorithm: Algorithm,
    /// Lua profile inside the container. The stock image ships `car.lua`.
    pub profile: String,
}

impl DatasetConfig {
    pub fn new(region: Region, data_root: impl Into<PathBuf>) -> Self {
        Self {
            region,
            data_root: data_root.into(),
            algorithm: Algorithm::Mld,
            profile: "/opt/car.lua".to_string(),
        }
    }
}

/// A prepared dataset on disk.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub data_dir: PathBuf,
    pub osrm_base: PathBuf,
    pub algorithm: Algorithm,
}

impl Dataset {
    /// Download and preprocess whatever is missing for `config`.
    pub fn ensure(config: &DatasetConfig) -> Result<Self, DatasetError> {
        let data_root = if config.data_root.is_absolute() {
            config.data_root.clone()
        } else {
            std::env::current_dir()?.join(&config.data_root)
        };
        let name = config.region.name();
        let data_dir = data_root.join(name);
        fs::create_dir_all(&data_dir)?;

        let pbf_path = data_dir.join(format!("{name}-latest.osm.pbf"));
        if !pbf_path.exists() {
            info!(url = %config.region.download_url(), "downloading OSM extract");
            download(&config.region.download_url(), &pbf_path)?;
        }

        let osrm_base = data_dir.join(format!("{name}-latest.osrm"));
        if !osrm_base.exists() {
            info!(region = name, "extracting road network");
            let pbf = container_path(&pbf_path);
            run_osrm_tool(&data_dir, &["osrm-extract", "-p", &config.profile, &pbf])?;
        }

        for &step in config.algorithm.steps() {
            let done = step
                .outputs()
                .iter()
                .all(|ext| osrm_base.with_extension(ext).exists());
            if !done {
                info!(region = name, tool = step.tool(), "preprocessing");
                run_osrm_tool(&data_dir, &[step.tool(), &container_path(&osrm_base)])?;
            }
        }

        Ok(Self {
            data_dir,
            osrm_base,
            algorithm: config.algorithm,
        })
    }

    /// Path of the `.osrm` base as seen inside a container mounting `data_dir`
    /// at `/data`.
    pub fn container_base(&self) -> String {
        container_path(&self.osrm_base)
    }
}

fn download(url: &str, dest: &Path) -> Result<(), DatasetError> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let tmp_path = dest.with_extension("part");
    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    writer.write_all(&response.bytes()?)?;
    writer.flush()?;
    fs::rename(tmp_path, dest)?;
    Ok(())
}

fn run_osrm_tool(data_dir: &Path, args: &[&str]) -> Result<(), DatasetError> {
    let status = Command::new("docker")
        .args(["run", "--rm", "-t", "-v"])
        .arg(format!("{}:/data", data_dir.display()))
        .arg(OSRM_IMAGE)
        .args(args)
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(DatasetError::ProcessFailure(format!(
            "{} exited with {status}",
            args.first().copied().unwrap_or("docker")
        )))
    }
}

fn container_path(path: &Path) -> String {
    let file = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    format!("/data/{file}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_name_and_url() {
        let region = Region::new("north-america/us/arizona");
        assert_eq!(region.name(), "arizona");
        assert_eq!(
            region.download_url(),
            "https://download.geofabrik.de/north-america/us/arizona-latest.osm.pbf"
        );
    }

    #[test]
    fn test_algorithm_steps() {
        assert_eq!(
            Algorithm::Mld.steps(),
            &[PrepStep::Partition, PrepStep::Customize]
        );
        assert_eq!(Algorithm::Ch.steps(), &[PrepStep::Contract]);
        assert_eq!(Algorithm::Ch.flag(), "ch");
    }

    #[test]
    fn test_container_path() {
        let path = Path::new("/tmp/osrm/arizona/arizona-latest.osrm");
        assert_eq!(container_path(path), "/data/arizona-latest.osrm");
    }
}

//! Generic config file loader; the file format is chosen by the file
//! name extension.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;

use crate::json5_from_str::json5_from_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigBackend {
    Json5,
    Yaml,
    Hcl,
}

impl ConfigBackend {
    pub fn load_config_file<T: DeserializeOwned>(self, path: &Path) -> Result<T> {
        let s = std::fs::read_to_string(path)
            .with_context(|| anyhow!("loading config file from {path:?}"))?;
        self.parse_config(&s)
            .with_context(|| anyhow!("config file {path:?}"))
    }

    pub fn parse_config<T: DeserializeOwned>(self, s: &str) -> Result<T> {
        match self {
            ConfigBackend::Json5 => json5_from_str(s).context("decoding JSON5"),
            ConfigBackend::Yaml => serde_yml::from_str(s).context("decoding YAML"),
            ConfigBackend::Hcl => hcl::from_str(s).context("decoding HCL"),
        }
    }
}

pub const FILE_EXTENSIONS: &[(&str, ConfigBackend)] = &[
    ("json5", ConfigBackend::Json5),
    ("json", ConfigBackend::Json5),
    ("yml", ConfigBackend::Yaml),
    ("yaml", ConfigBackend::Yaml),
    ("hcl", ConfigBackend::Hcl),
];

pub fn backend_from_path(path: &Path) -> Result<ConfigBackend> {
    if let Some(ext) = path.extension() {
        if let Some(ext) = ext.to_str() {
            if let Some((_, backend)) = FILE_EXTENSIONS.iter().find(|(e, _b)| *e == ext) {
                Ok(*backend)
            } else {
                bail!("given file path has an unknown extension {ext:?}: {path:?}")
            }
        } else {
            bail!("given file path has an extension that is not unicode: {path:?}")
        }
    } else {
        bail!(
            "given file path does not have an extension \
             for determining the file type: {path:?}"
        )
    }
}

fn add_extension(path: &Path, extension: &str) -> Option<PathBuf> {
    let mut file_name = path.file_name()?.to_owned();
    file_name.push(".");
    file_name.push(extension);
    Some(path.with_file_name(file_name))
}

pub trait LoadConfigFile: DeserializeOwned {
    /// The extensions from `FILE_EXTENSIONS` are appended and tried.
    fn default_config_path_without_suffix() -> Result<Option<PathBuf>>;

    /// If `path` is given, the file must exist. Otherwise the default
    /// location is tried with every known extension; exactly one
    /// existing file is loaded, several are an error, none calls
    /// `or_else` with a message listing what was tried.
    fn load_config<P: AsRef<Path>>(
        path: Option<P>,
        or_else: impl FnOnce(String) -> Result<Self>,
    ) -> Result<Self> {
        if let Some(path) = path {
            let path = path.as_ref();
            let backend = backend_from_path(path)?;
            backend.load_config_file(path)
        } else if let Some(path) = Self::default_config_path_without_suffix()? {
            let mut tried = Vec::new();
            let mut found = Vec::new();
            for (extension, backend) in FILE_EXTENSIONS {
                let path = add_extension(&path, extension)
                    .ok_or_else(|| anyhow!("path is missing a file name: {path:?}"))?;
                if path.exists() {
                    found.push((path.clone(), *backend));
                }
                tried.push(path);
            }
            match found.as_slice() {
                [] => or_else(format!("tried the default paths: {tried:?}")),
                [(path, backend)] => backend.load_config_file(path),
                _ => {
                    let paths: Vec<_> = found.iter().map(|(path, _)| path).collect();
                    bail!("multiple config file paths found, leading to ambiguity: {paths:?}")
                }
            }
        } else {
            or_else(
                "no path was given and there is no default config location for this type"
                    .into(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_backend_from_path() -> Result<()> {
        assert_eq!(
            backend_from_path(Path::new("a/b.json5"))?,
            ConfigBackend::Json5
        );
        assert_eq!(backend_from_path(Path::new("b.yml"))?, ConfigBackend::Yaml);
        assert_eq!(backend_from_path(Path::new("b.hcl"))?, ConfigBackend::Hcl);
        assert!(backend_from_path(Path::new("b.toml")).is_err());
        assert!(backend_from_path(Path::new("b")).is_err());
        Ok(())
    }

    #[test]
    fn t_add_extension() {
        assert_eq!(
            add_extension(Path::new("dir/lattice-perf"), "yaml"),
            Some(PathBuf::from("dir/lattice-perf.yaml"))
        );
    }
}

//! Friendly names of lights, kept in a JSON file of the form
//! `{ "lamp_3": { "friendly_name": "Kitchen" } }`.
use crate::light::light_ref::LightRef;
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum NamesError {
    #[error("Device names file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Device names file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub friendly_name: String,
}

#[derive(Debug, Clone)]
pub struct DeviceNames {
    path: PathBuf,
    names: BTreeMap<String, NameEntry>,
}

pub fn default_name(light: LightRef) -> String {
    match light {
        LightRef::Lamp(a) => format!("DALI Lamp {}", a),
        LightRef::Group(g) => format!("DALI Group {}", g),
    }
}

impl DeviceNames {
    /// No names, backed by `path`
    pub fn empty(path: &Path) -> DeviceNames {
        DeviceNames {
            path: path.to_path_buf(),
            names: BTreeMap::new(),
        }
    }

    /// Load names from `path`, creating an empty file if there is none
    pub async fn load(path: &Path) -> Result<DeviceNames, NamesError> {
        let io_err = |source| NamesError::Io {
            path: path.to_path_buf(),
            source,
        };
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No device names file, creating {}", path.display());
                tokio::fs::write(path, "{}\n").await.map_err(io_err)?;
                return Ok(DeviceNames::empty(path));
            }
            Err(e) => return Err(io_err(e)),
        };
        debug!("Loading devices names from {}", path.display());
        let names = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&content).map_err(|source| NamesError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };
        Ok(DeviceNames {
            path: path.to_path_buf(),
            names,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn friendly_name(&self, light: LightRef) -> String {
        self.names
            .get(&light.to_string())
            .map(|e| e.friendly_name.clone())
            .unwrap_or_else(|| default_name(light))
    }

    /// Store the current name of every light in the file
    pub async fn save<I>(&mut self, lights: I) -> Result<(), NamesError>
    where
        I: IntoIterator<Item = LightRef>,
    {
        let names = lights
            .into_iter()
            .map(|l| {
                (
                    l.to_string(),
                    NameEntry {
                        friendly_name: self.friendly_name(l),
                    },
                )
            })
            .collect();
        self.names = names;
        let json = serde_json::to_string_pretty(&self.names).map_err(|source| NamesError::Json {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| NamesError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::address::{GroupAddress, Short};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dali2mqtt-{}-{}.json", std::process::id(), name))
    }

    #[tokio::test]
    async fn create_and_save_test() {
        let path = temp_path("create");
        let _ = tokio::fs::remove_file(&path).await;
        let mut names = DeviceNames::load(&path).await.unwrap();
        assert!(names.is_empty());
        assert!(path.exists());

        let lamp = LightRef::Lamp(Short::new(3));
        let group = LightRef::Group(GroupAddress::new(1));
        assert_eq!(names.friendly_name(lamp), "DALI Lamp 3");
        names.save([lamp, group]).await.unwrap();

        let names = DeviceNames::load(&path).await.unwrap();
        assert!(!names.is_empty());
        assert_eq!(names.friendly_name(group), "DALI Group 1");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn friendly_name_test() {
        let path = temp_path("friendly");
        tokio::fs::write(&path, r#"{"lamp_5": {"friendly_name": "Kitchen"}}"#)
            .await
            .unwrap();
        let names = DeviceNames::load(&path).await.unwrap();
        assert_eq!(names.friendly_name(LightRef::Lamp(Short::new(5))), "Kitchen");
        assert_eq!(names.friendly_name(LightRef::Lamp(Short::new(6))), "DALI Lamp 6");

        tokio::fs::write(&path, "[1, 2]").await.unwrap();
        assert!(matches!(DeviceNames::load(&path).await, Err(NamesError::Json { .. })));
        let _ = tokio::fs::remove_file(&path).await;
    }
}

/// Virtual point cloud manifest reading and writing.
/// A manifest is a FeatureCollection-shaped JSON document in which every
/// feature references one tile file through its `data` asset.
use crate::bounds::PointCloudBounds;
use crate::error::VpcError;
use las::Reader;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One tile referenced by a manifest.
#[derive(Debug, Clone)]
pub struct TileFile {
    /// Tile path, resolved against the manifest location on read
    pub path: PathBuf,
    pub point_count: u64,
    pub bbox: Option<[f64; 6]>,
}

/// A set of tiled point cloud files treated as one logical dataset.
#[derive(Debug, Clone, Default)]
pub struct VirtualPointCloud {
    pub files: Vec<TileFile>,
}

#[derive(Serialize, Deserialize)]
struct ManifestDoc {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<FeatureDoc>,
}

#[derive(Serialize, Deserialize)]
struct FeatureDoc {
    #[serde(rename = "type")]
    kind: String,
    assets: AssetsDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bbox: Option<Vec<f64>>,
    #[serde(default)]
    properties: PropertiesDoc,
}

#[derive(Serialize, Deserialize)]
struct AssetsDoc {
    data: AssetDoc,
}

#[derive(Serialize, Deserialize)]
struct AssetDoc {
    href: String,
}

#[derive(Serialize, Deserialize, Default)]
struct PropertiesDoc {
    #[serde(rename = "pc:count", default, skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
}

impl VirtualPointCloud {
    /// Read a manifest, resolving relative tile references against its
    /// parent directory. Preserves the manifest's file order.
    pub fn read(path: &Path) -> Result<Self, VpcError> {
        let text = fs::read_to_string(path).map_err(|source| VpcError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let doc: ManifestDoc =
            serde_json::from_str(&text).map_err(|source| VpcError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if doc.kind != "FeatureCollection" {
            return Err(VpcError::Invalid {
                path: path.to_path_buf(),
                reason: format!("expected FeatureCollection, got {}", doc.kind),
            });
        }

        let base_dir = path.parent().unwrap_or(Path::new("."));

        let files = doc
            .features
            .into_iter()
            .map(|feature| {
                let href = PathBuf::from(feature.assets.data.href);
                let resolved = if href.is_relative() {
                    base_dir.join(href)
                } else {
                    href
                };

                TileFile {
                    path: resolved,
                    point_count: feature.properties.count.unwrap_or(0),
                    bbox: feature.bbox.and_then(|b| b.try_into().ok()),
                }
            })
            .collect();

        Ok(Self { files })
    }

    /// Build a manifest over a set of tile files, reading each file's
    /// header for its point count and spatial bounds.
    pub fn build_from_files(paths: &[PathBuf]) -> Result<Self, VpcError> {
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            let (point_count, bounds) = read_header_stats(path)?;
            files.push(TileFile {
                path: path.clone(),
                point_count,
                bbox: Some(bounds.to_bbox()),
            });
        }

        Ok(Self { files })
    }

    /// Write the manifest, storing tile references relative to the
    /// manifest's own directory where possible.
    pub fn write(&self, path: &Path) -> Result<(), VpcError> {
        let base_dir = path.parent().unwrap_or(Path::new("."));

        let features = self
            .files
            .iter()
            .map(|file| {
                let href = file
                    .path
                    .strip_prefix(base_dir)
                    .unwrap_or(&file.path)
                    .to_string_lossy()
                    .into_owned();

                FeatureDoc {
                    kind: "Feature".to_string(),
                    assets: AssetsDoc {
                        data: AssetDoc { href },
                    },
                    bbox: file.bbox.map(|b| b.to_vec()),
                    properties: PropertiesDoc {
                        count: Some(file.point_count),
                    },
                }
            })
            .collect();

        let doc = ManifestDoc {
            kind: "FeatureCollection".to_string(),
            features,
        };

        let json = serde_json::to_string_pretty(&doc).map_err(|source| VpcError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        fs::write(path, json).map_err(|source| VpcError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Read point count and bounds from a tile's LAS header
fn read_header_stats(path: &Path) -> Result<(u64, PointCloudBounds), VpcError> {
    let file = File::open(path).map_err(|source| VpcError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = Reader::new(BufReader::new(file)).map_err(|source| VpcError::TileHeader {
        path: path.to_path_buf(),
        source,
    })?;

    let header = reader.header();
    let las_bounds = header.bounds();

    let mut bounds = PointCloudBounds::new();
    bounds.update(las_bounds.min.x, las_bounds.min.y, las_bounds.min.z);
    bounds.update(las_bounds.max.x, las_bounds.max.y, las_bounds.max.z);

    Ok((header.number_of_points(), bounds))
}

/// Pipeline execution engine backed by the `las` crate.
/// The orchestration core only builds declarative pipelines; this module is
/// the collaborator that actually decodes, transforms and encodes points.
use crate::bounds::PointCloudBounds;
use crate::constants::{
    CRS_VLR_RECORD_ID, CRS_VLR_USER_ID, GEOGRAPHIC_SCALE, PROJECTED_SCALE,
};
use crate::error::EngineError;
use crate::filter::FilterPredicate;
use crate::pipeline::{Pipeline, ReaderConfig, WriterConfig};
use las::{Builder, Header, Reader, Transform, Vector, Vlr, Writer};
use proj4rs::Proj;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Per-tile execution statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct TileStats {
    pub points_read: u64,
    pub points_written: u64,
}

/// Executes declarative pipelines.
/// Implementations must be shareable across worker threads.
pub trait PipelineEngine: Send + Sync {
    fn execute(&self, pipeline: &Pipeline) -> Result<TileStats, EngineError>;
}

/// Engine reading and writing LAS/LAZ through the `las` crate, with
/// reprojection delegated to proj4rs.
#[derive(Debug, Default)]
pub struct LasPipelineEngine;

impl LasPipelineEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineEngine for LasPipelineEngine {
    fn execute(&self, pipeline: &Pipeline) -> Result<TileStats, EngineError> {
        let reader_config = pipeline
            .reader()
            .ok_or_else(|| EngineError::MalformedPipeline("missing reader stage".to_string()))?;
        let writer_config = pipeline
            .writer()
            .ok_or_else(|| EngineError::MalformedPipeline("missing writer stage".to_string()))?;

        let writer_predicate = compile_predicate(writer_config.where_expr.as_deref())?;
        // A standalone filter stage drops points before anything else runs.
        let stage_predicate =
            compile_predicate(pipeline.filter().map(|config| config.where_expr.as_str()))?;

        let mut reader = create_reader(&reader_config.input)?;
        let header = reader.header().clone();
        log_file_info(&reader_config.input, &header);

        match pipeline.reproject() {
            Some(reproject_config) => {
                let pre_predicate = compile_predicate(reproject_config.where_expr.as_deref())?;
                execute_reprojected(
                    &mut reader,
                    &header,
                    reader_config,
                    writer_config,
                    &reproject_config.target_crs,
                    stage_predicate.as_ref(),
                    pre_predicate.as_ref(),
                    writer_predicate.as_ref(),
                )
            }
            None => execute_streaming(
                &mut reader,
                &header,
                reader_config,
                writer_config,
                stage_predicate.as_ref(),
                writer_predicate.as_ref(),
            ),
        }
    }
}

/// Straight copy: stream points from reader to writer, applying the
/// writer's row predicate.
fn execute_streaming(
    reader: &mut Reader,
    header: &Header,
    reader_config: &ReaderConfig,
    writer_config: &WriterConfig,
    stage_predicate: Option<&FilterPredicate>,
    writer_predicate: Option<&FilterPredicate>,
) -> Result<TileStats, EngineError> {
    let mut builder = output_builder(header, writer_config);

    if let Some(crs) = &reader_config.override_crs {
        set_crs_vlr(&mut builder, crs);
    }

    let mut writer = Writer::from_path(&writer_config.output, builder.into_header()?)?;
    let mut stats = TileStats::default();

    for point_result in reader.points() {
        let point = point_result?;
        stats.points_read += 1;

        if !passes(stage_predicate, &point) || !passes(writer_predicate, &point) {
            continue;
        }

        writer.write_point(point)?;
        stats.points_written += 1;
    }

    writer.close()?;
    Ok(stats)
}

/// Reprojection path: points are filtered, transformed and buffered so the
/// output header's scale and offset can be re-centred on the transformed
/// bounds before anything is written. The source file's transforms can put
/// reprojected coordinates outside the i32 record range.
fn execute_reprojected(
    reader: &mut Reader,
    header: &Header,
    reader_config: &ReaderConfig,
    writer_config: &WriterConfig,
    target_crs: &str,
    stage_predicate: Option<&FilterPredicate>,
    pre_predicate: Option<&FilterPredicate>,
    writer_predicate: Option<&FilterPredicate>,
) -> Result<TileStats, EngineError> {
    let source_crs = reader_config
        .override_crs
        .clone()
        .or_else(|| crs_from_vlrs(header))
        .ok_or_else(|| EngineError::MissingSourceCrs {
            input: reader_config.input.clone(),
        })?;

    let source = resolve_proj(&source_crs)?;
    let target = resolve_proj(target_crs)?;

    let mut stats = TileStats::default();
    let mut points = Vec::new();
    let mut bounds = PointCloudBounds::new();

    for point_result in reader.points() {
        let mut point = point_result?;
        stats.points_read += 1;

        if !passes(stage_predicate, &point) || !passes(pre_predicate, &point) {
            continue;
        }

        let mut coord = (point.x, point.y, point.z);
        if source.is_latlong() {
            coord.0 = coord.0.to_radians();
            coord.1 = coord.1.to_radians();
        }

        proj4rs::transform::transform(&source, &target, &mut coord).map_err(|e| {
            EngineError::Transform {
                message: e.to_string(),
            }
        })?;

        if target.is_latlong() {
            coord.0 = coord.0.to_degrees();
            coord.1 = coord.1.to_degrees();
        }

        point.x = coord.0;
        point.y = coord.1;
        point.z = coord.2;

        bounds.update(point.x, point.y, point.z);
        points.push(point);
    }

    let mut builder = output_builder(header, writer_config);
    set_crs_vlr(&mut builder, target_crs);

    if bounds.is_finite() {
        let scale = if target.is_latlong() {
            GEOGRAPHIC_SCALE
        } else {
            PROJECTED_SCALE
        };
        builder.transforms = Vector {
            x: centred_transform(bounds.min_x, bounds.max_x, scale),
            y: centred_transform(bounds.min_y, bounds.max_y, scale),
            z: centred_transform(bounds.min_z, bounds.max_z, scale),
        };
    }

    let mut writer = Writer::from_path(&writer_config.output, builder.into_header()?)?;

    for point in points {
        if !passes(writer_predicate, &point) {
            continue;
        }
        writer.write_point(point)?;
        stats.points_written += 1;
    }

    writer.close()?;
    Ok(stats)
}

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
fn create_reader(path: &Path) -> Result<Reader, EngineError> {
    let file = File::open(path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

fn compile_predicate(expr: Option<&str>) -> Result<Option<FilterPredicate>, EngineError> {
    expr.map(|e| FilterPredicate::parse(e).map_err(EngineError::Filter))
        .transpose()
}

fn passes(predicate: Option<&FilterPredicate>, point: &las::Point) -> bool {
    predicate.map_or(true, |p| p.matches(point))
}

/// Start the output header from the input's metadata, or from scratch when
/// the writer is not forwarding it. Compression always follows the output
/// extension.
fn output_builder(header: &Header, writer_config: &WriterConfig) -> Builder {
    let mut builder = if writer_config.forward_metadata {
        let mut forwarded = Builder::from(header.version());
        forwarded.point_format = header.point_format().clone();
        forwarded.transforms = header.transforms().clone();
        forwarded.vlrs = header
            .vlrs()
            .iter()
            .filter(|vlr| vlr.user_id != "laszip encoded")
            .cloned()
            .collect();
        forwarded.system_identifier = header.system_identifier().to_string();
        forwarded.generating_software = header.generating_software().to_string();
        forwarded
    } else {
        Builder::from((1, 4))
    };
    builder.point_format.is_compressed = is_laz_output(&writer_config.output);
    builder
}

fn is_laz_output(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("laz"))
        .unwrap_or(false)
}

/// Replace any coordinate system VLRs with a single record carrying the
/// given CRS. An EPSG identifier is expanded to its WKT definition; any
/// other identifier is stored verbatim.
fn set_crs_vlr(builder: &mut Builder, crs: &str) {
    builder
        .vlrs
        .retain(|vlr| vlr.user_id != CRS_VLR_USER_ID);

    let payload = match epsg_code(crs).and_then(crs_definitions::from_code) {
        Some(def) => def.wkt.to_string(),
        None => crs.to_string(),
    };

    builder.vlrs.push(Vlr {
        user_id: CRS_VLR_USER_ID.to_string(),
        record_id: CRS_VLR_RECORD_ID,
        description: "OGC Coordinate System WKT".to_string(),
        data: payload.into_bytes(),
    });
}

/// Extract a resolvable CRS identifier from the file's own VLRs.
/// Only identifiers this tool writes itself (EPSG codes or proj strings)
/// are recognised; arbitrary WKT is not interpreted.
fn crs_from_vlrs(header: &Header) -> Option<String> {
    header
        .vlrs()
        .iter()
        .filter(|vlr| vlr.user_id == CRS_VLR_USER_ID && vlr.record_id == CRS_VLR_RECORD_ID)
        .find_map(|vlr| {
            let text = String::from_utf8_lossy(&vlr.data);
            let text = text.trim_end_matches('\0').trim();
            if epsg_code(text).is_some() || text.contains("+proj=") {
                Some(text.to_string())
            } else {
                None
            }
        })
}

fn epsg_code(crs: &str) -> Option<u16> {
    let rest = crs.trim();
    let rest = rest
        .strip_prefix("EPSG:")
        .or_else(|| rest.strip_prefix("epsg:"))?;
    rest.parse().ok()
}

/// Resolve a CRS identifier to a projection definition
fn resolve_proj(crs: &str) -> Result<Proj, EngineError> {
    let proj_string = match epsg_code(crs) {
        Some(code) => crs_definitions::from_code(code)
            .ok_or_else(|| EngineError::InvalidCrs {
                crs: crs.to_string(),
                message: "unknown EPSG code".to_string(),
            })?
            .proj4
            .to_string(),
        None => crs.trim().to_string(),
    };

    Proj::from_proj_string(&proj_string).map_err(|e| EngineError::InvalidCrs {
        crs: crs.to_string(),
        message: e.to_string(),
    })
}

fn centred_transform(min: f64, max: f64, scale: f64) -> Transform {
    Transform {
        scale,
        offset: ((min + max) / 2.0).round(),
    }
}

fn log_file_info(path: &Path, header: &Header) {
    debug!(
        "reading {}: LAS {}.{}, {} points, point format {}",
        path.display(),
        header.version().major,
        header.version().minor,
        header.number_of_points(),
        header.point_format().to_u8().unwrap_or(0),
    );
}

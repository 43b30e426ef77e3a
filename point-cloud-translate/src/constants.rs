/// Shared configuration for point cloud translation

/// File extension marking a virtual point cloud manifest
pub const VPC_EXTENSION: &str = "vpc";

/// Output formats accepted on the command line
pub const SUPPORTED_OUTPUT_FORMATS: &[&str] = &["las", "laz"];

/// VLR user id carrying coordinate reference system records
pub const CRS_VLR_USER_ID: &str = "LASF_Projection";

/// VLR record id for the OGC coordinate system WKT record
pub const CRS_VLR_RECORD_ID: u16 = 2112;

/// Coordinate scale written after reprojecting to a geographic CRS
pub const GEOGRAPHIC_SCALE: f64 = 1e-7;

/// Coordinate scale written after reprojecting to a projected CRS
pub const PROJECTED_SCALE: f64 = 1e-3;

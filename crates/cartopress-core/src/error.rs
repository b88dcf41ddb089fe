use thiserror::Error;

/// Invalid or contradictory user input. Always detected before any data
/// source is touched; fatal and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown color '{0}'")]
    UnknownColor(String),

    #[error("malformed hex color '{0}'")]
    MalformedHexColor(String),

    #[error("unknown linestyle '{0}'")]
    UnknownLinestyle(String),

    #[error("unknown quadrant '{0}', expected one of tr, br, bl, tl")]
    UnknownQuadrant(String),

    #[error("width divisor must be positive, got {0}")]
    NonPositiveDivisor(f64),

    #[error("malformed size '{0}', expected <width>x<height> in mm")]
    MalformedSize(String),

    #[error("malformed scale '{0}', expected 1:<denominator>")]
    MalformedScale(String),

    #[error("reference point '{0}' is unknown to the data source")]
    UnknownReferencePoint(String),

    #[error("options {0} and {1} are mutually exclusive")]
    ConflictingOptions(&'static str, &'static str),

    #[error("unknown legend position '{0}'")]
    UnknownLegendPosition(String),

    #[error("malformed layer spec '{0}': {1}")]
    MalformedLayerSpec(String, String),
}

/// Failure talking to the spatial data source (connection, query, or file
/// read). Fatal for the whole render; a partial map is never written.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("file read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed geometry payload: {0}")]
    Payload(String),

    #[error("source kind not supported by this backend: {0}")]
    Unsupported(String),
}

/// Top-level error for the layer pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

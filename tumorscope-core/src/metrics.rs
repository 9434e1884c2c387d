//! Clinical metrics and their display formatting
//!
//! Metric values come straight from the analysis service and are kept as raw
//! JSON until they are displayed. Formatting never fails: anything that is
//! not a usable number shows up as zero.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Metrics reported for one analysis, stored as received
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub depth_mm: Option<Value>,
    #[serde(default)]
    pub volume_mm3: Option<Value>,
    #[serde(default)]
    pub surface_area_mm2: Option<Value>,
    #[serde(default)]
    pub num_slices: Option<Value>,
}

impl Metrics {
    /// Metrics with only a depth value, the shape of a reconstruction response
    pub fn with_depth(depth_mm: f64) -> Self {
        Self {
            depth_mm: Some(Value::from(depth_mm)),
            ..Default::default()
        }
    }

    pub fn get(&self, field: MetricField) -> Option<&Value> {
        match field {
            MetricField::Depth => self.depth_mm.as_ref(),
            MetricField::Volume => self.volume_mm3.as_ref(),
            MetricField::SurfaceArea => self.surface_area_mm2.as_ref(),
            MetricField::NumSlices => self.num_slices.as_ref(),
        }
    }
}

/// A displayable metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    Depth,
    Volume,
    SurfaceArea,
    NumSlices,
}

impl MetricField {
    pub const ALL: [MetricField; 4] = [
        MetricField::Depth,
        MetricField::Volume,
        MetricField::SurfaceArea,
        MetricField::NumSlices,
    ];

    /// Key used by the analysis service
    pub fn key(&self) -> &'static str {
        match self {
            MetricField::Depth => "depth_mm",
            MetricField::Volume => "volume_mm3",
            MetricField::SurfaceArea => "surface_area_mm2",
            MetricField::NumSlices => "num_slices",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricField::Depth => "Depth",
            MetricField::Volume => "Volume",
            MetricField::SurfaceArea => "Surface Area",
            MetricField::NumSlices => "Number of Slices",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            MetricField::Depth => Some("mm"),
            MetricField::Volume => Some("mm³"),
            MetricField::SurfaceArea => Some("mm²"),
            MetricField::NumSlices => None,
        }
    }

    /// Slice count is a count, everything else is a measurement
    pub fn is_count(&self) -> bool {
        matches!(self, MetricField::NumSlices)
    }
}

/// Best-effort numeric reading of a JSON value.
///
/// Numbers pass through, strings are parsed after trimming (the empty
/// string reads as zero), booleans read as 1/0. Null, arrays, objects and
/// non-finite results are `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    number.filter(|n| n.is_finite())
}

/// Clamp-and-format policy for metric display
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsProjector;

impl MetricsProjector {
    /// Format one metric for display, without unit
    pub fn project(&self, metrics: &Metrics, field: MetricField) -> String {
        let value = metrics.get(field);
        if field.is_count() {
            self.project_count(value)
        } else {
            self.project_measurement(value)
        }
    }

    /// Invalid -> 0, negative -> 0, then exactly two decimals.
    ///
    /// Rounding works on the exact binary value of the `f64`, not on its
    /// shortest decimal spelling: `2.675` is stored as `2.67499...` and prints
    /// `"2.67"`, while `12.345` is stored as `12.34500...` and prints `"12.35"`.
    pub fn project_measurement(&self, value: Option<&Value>) -> String {
        let number = value.and_then(coerce_number).unwrap_or(0.0);
        // `<=` also folds -0.0, which would otherwise print as "-0.00"
        let clamped = if number <= 0.0 { 0.0 } else { number };
        format!("{:.2}", clamped)
    }

    /// Integer display, passed through without clamping
    pub fn project_count(&self, value: Option<&Value>) -> String {
        let count = match value {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            Some(other) => coerce_number(other).map(|f| f.trunc() as i64),
            None => None,
        }
        .unwrap_or(0);

        if count < 0 {
            log::warn!("negative slice count {} received, displaying as-is", count);
        }
        count.to_string()
    }

    /// Every field, in display order
    pub fn project_all(&self, metrics: &Metrics) -> Vec<(MetricField, String)> {
        MetricField::ALL
            .iter()
            .map(|field| (*field, self.project(metrics, *field)))
            .collect()
    }
}

/// Overlay color class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayTone {
    /// No tumor detected
    Warning,
    /// Any tumor subtype
    Success,
}

impl OverlayTone {
    pub fn hex(&self) -> &'static str {
        match self {
            OverlayTone::Warning => "#ff9800",
            OverlayTone::Success => "#4CAF50",
        }
    }

    pub fn rgb(&self) -> [f32; 3] {
        match self {
            OverlayTone::Warning => [1.0, 152.0 / 255.0, 0.0],
            OverlayTone::Success => [76.0 / 255.0, 175.0 / 255.0, 80.0 / 255.0],
        }
    }
}

/// Classification tag of the analysed scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationLabel(String);

impl ClassificationLabel {
    pub const NO_TUMOR: &'static str = "notumor";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn from_option(label: Option<String>) -> Self {
        Self(label.unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_no_tumor(&self) -> bool {
        self.0.trim().eq_ignore_ascii_case(Self::NO_TUMOR)
    }

    pub fn tone(&self) -> OverlayTone {
        if self.is_no_tumor() {
            OverlayTone::Warning
        } else {
            OverlayTone::Success
        }
    }

    pub fn display_name(&self) -> &str {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            "Unknown"
        } else {
            trimmed
        }
    }
}

impl From<&str> for ClassificationLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One line of the metrics overlay
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub field: MetricField,
    pub value: String,
}

impl fmt::Display for OverlayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field.unit() {
            Some(unit) => write!(f, "{}: {} {}", self.field.label(), self.value, unit),
            None => write!(f, "{}: {}", self.field.label(), self.value),
        }
    }
}

/// Textual overlay shown next to the 3D view
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsOverlay {
    pub label: String,
    pub tone: OverlayTone,
    pub lines: Vec<OverlayLine>,
}

impl MetricsOverlay {
    pub fn new(metrics: &Metrics, label: &ClassificationLabel) -> Self {
        let projector = MetricsProjector;
        let lines = projector
            .project_all(metrics)
            .into_iter()
            .map(|(field, value)| OverlayLine { field, value })
            .collect();

        Self {
            label: label.display_name().to_string(),
            tone: label.tone(),
            lines,
        }
    }

    pub fn line(&self, field: MetricField) -> Option<&OverlayLine> {
        self.lines.iter().find(|line| line.field == field)
    }
}

impl fmt::Display for MetricsOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tumor Type: {}", self.label)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

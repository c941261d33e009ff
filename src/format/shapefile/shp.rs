//! `.shp` geometry file parser.
//!
//! Layout (ESRI Shapefile Technical Description):
//!
//! ```text
//! 0    file code 9994          (i32, big-endian)
//! 24   file length in words    (i32, big-endian)
//! 28   version 1000            (i32, little-endian)
//! 32   shape type              (i32, little-endian)
//! 36   bounding box            (8 x f64, little-endian)
//! 100  records: [number (BE), content length in words (BE), content (LE)]*
//! ```

use crate::error::ShapefileError;
use crate::format::geojson::{Geometry, Position};
use crate::io::{read_f64_le, read_i32_be, read_i32_le};

/// Size of the main file header.
pub const SHP_HEADER_SIZE: usize = 100;

/// Size of each record header (record number + content length).
const RECORD_HEADER_SIZE: usize = 8;

/// Magic number at the start of every `.shp` file.
const FILE_CODE: i32 = 9994;

/// The only version ever published.
const VERSION: i32 = 1000;

// =============================================================================
// ShapeType
// =============================================================================

/// Shape types that can be expressed as GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
}

/// Geometry family, ignoring Z/M dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeFamily {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
}

impl ShapeType {
    /// Map a shape type code to a supported shape type.
    ///
    /// MultiPatch (31) and unknown codes are rejected.
    pub fn from_code(code: i32) -> Result<Self, ShapefileError> {
        let shape_type = match code {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            other => return Err(ShapefileError::UnsupportedShapeType(other)),
        };
        Ok(shape_type)
    }

    /// Check if records of this type carry Z values.
    pub const fn has_z(&self) -> bool {
        matches!(
            self,
            ShapeType::PointZ | ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ
        )
    }

    const fn family(&self) -> ShapeFamily {
        match self {
            ShapeType::Null => ShapeFamily::Null,
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => ShapeFamily::Point,
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
                ShapeFamily::PolyLine
            }
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => ShapeFamily::Polygon,
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                ShapeFamily::MultiPoint
            }
        }
    }
}

// =============================================================================
// ShpHeader
// =============================================================================

/// Parsed `.shp` main file header.
#[derive(Debug, Clone, PartialEq)]
pub struct ShpHeader {
    /// Shape type declared for the whole file
    pub shape_type: ShapeType,

    /// File length in bytes, as declared in the header
    pub file_length: usize,

    /// Bounding box: [xmin, ymin, xmax, ymax]
    pub bbox: [f64; 4],
}

impl ShpHeader {
    /// Parse the 100-byte main file header.
    pub fn parse(bytes: &[u8]) -> Result<Self, ShapefileError> {
        if bytes.len() < SHP_HEADER_SIZE {
            return Err(ShapefileError::FileTooSmall {
                required: SHP_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let file_code = read_i32_be(&bytes[0..4]);
        if file_code != FILE_CODE {
            return Err(ShapefileError::InvalidFileCode(file_code));
        }

        let version = read_i32_le(&bytes[28..32]);
        if version != VERSION {
            return Err(ShapefileError::InvalidVersion(version));
        }

        let shape_type = ShapeType::from_code(read_i32_le(&bytes[32..36]))?;
        let file_length = read_i32_be(&bytes[24..28]).max(0) as usize * 2;

        let bbox = [
            read_f64_le(&bytes[36..44]),
            read_f64_le(&bytes[44..52]),
            read_f64_le(&bytes[52..60]),
            read_f64_le(&bytes[60..68]),
        ];

        Ok(Self {
            shape_type,
            file_length,
            bbox,
        })
    }
}

// =============================================================================
// Record parsing
// =============================================================================

/// Bounds-checked little-endian reader over one record's content.
struct RecordCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Absolute offset of `bytes[0]` in the file (for error reporting)
    base: usize,
    record: usize,
}

impl<'a> RecordCursor<'a> {
    fn new(bytes: &'a [u8], base: usize, record: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            base,
            record,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ShapefileError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ShapefileError::TruncatedRecord {
                record: self.record,
                offset: self.base + self.pos,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn i32(&mut self) -> Result<i32, ShapefileError> {
        self.take(4).map(read_i32_le)
    }

    fn f64(&mut self) -> Result<f64, ShapefileError> {
        self.take(8).map(read_f64_le)
    }

    /// Read a non-negative count.
    fn count(&mut self, what: &str) -> Result<usize, ShapefileError> {
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| ShapefileError::InvalidRecord {
            record: self.record,
            message: format!("negative {} count {}", what, n),
        })
    }

    /// Read `n` XY pairs.
    fn points(&mut self, n: usize) -> Result<Vec<Position>, ShapefileError> {
        let raw = self.take(n.saturating_mul(16))?;
        Ok(raw
            .chunks_exact(16)
            .map(|xy| vec![read_f64_le(&xy[0..8]), read_f64_le(&xy[8..16])])
            .collect())
    }

    /// Read the Z range and Z array, appending Z to each point.
    fn append_z(&mut self, points: &mut [Position]) -> Result<(), ShapefileError> {
        self.take(16)?;
        let raw = self.take(points.len().saturating_mul(8))?;
        for (point, z) in points.iter_mut().zip(raw.chunks_exact(8)) {
            point.push(read_f64_le(z));
        }
        Ok(())
    }
}

/// Read every record of a `.shp` file.
///
/// Returns one entry per record, in file order. Null shapes yield `None`.
///
/// # Errors
/// * Header errors (file code, version, unsupported shape type)
/// * `TruncatedRecord` when a record extends past the end of the data
/// * `InvalidRecord` for negative counts or out-of-range part indices
pub fn read_shapes(bytes: &[u8]) -> Result<Vec<Option<Geometry>>, ShapefileError> {
    let header = ShpHeader::parse(bytes)?;

    // Trust the data length over the header when they disagree
    let end = if header.file_length >= SHP_HEADER_SIZE {
        header.file_length.min(bytes.len())
    } else {
        bytes.len()
    };

    let mut shapes = Vec::new();
    let mut offset = SHP_HEADER_SIZE;

    while offset + RECORD_HEADER_SIZE <= end {
        let record = shapes.len();
        let content_words = read_i32_be(&bytes[offset + 4..offset + 8]);
        let content_len = usize::try_from(content_words)
            .map_err(|_| ShapefileError::InvalidRecord {
                record,
                message: format!("negative content length {}", content_words),
            })?
            * 2;

        let start = offset + RECORD_HEADER_SIZE;
        let stop = start
            .checked_add(content_len)
            .filter(|stop| *stop <= end)
            .ok_or(ShapefileError::TruncatedRecord { record, offset })?;

        let mut cursor = RecordCursor::new(&bytes[start..stop], start, record);
        shapes.push(parse_record(&mut cursor)?);

        offset = stop;
    }

    Ok(shapes)
}

fn parse_record(cursor: &mut RecordCursor<'_>) -> Result<Option<Geometry>, ShapefileError> {
    let shape_type = ShapeType::from_code(cursor.i32()?)?;

    match shape_type.family() {
        ShapeFamily::Null => Ok(None),
        ShapeFamily::Point => {
            let mut point = vec![cursor.f64()?, cursor.f64()?];
            if shape_type.has_z() {
                point.push(cursor.f64()?);
            }
            Ok(Some(Geometry::Point { coordinates: point }))
        }
        ShapeFamily::MultiPoint => {
            cursor.take(32)?; // bounding box
            let num_points = cursor.count("point")?;
            let mut points = cursor.points(num_points)?;
            if shape_type.has_z() {
                cursor.append_z(&mut points)?;
            }

            Ok(match points.len() {
                0 => None,
                1 => points
                    .pop()
                    .map(|coordinates| Geometry::Point { coordinates }),
                _ => Some(Geometry::MultiPoint {
                    coordinates: points,
                }),
            })
        }
        ShapeFamily::PolyLine | ShapeFamily::Polygon => {
            cursor.take(32)?; // bounding box
            let num_parts = cursor.count("part")?;
            let num_points = cursor.count("point")?;

            let raw_parts = cursor.take(num_parts.saturating_mul(4))?;
            let parts: Vec<i32> = raw_parts.chunks_exact(4).map(read_i32_le).collect();

            let mut points = cursor.points(num_points)?;
            if shape_type.has_z() {
                cursor.append_z(&mut points)?;
            }

            let rings = split_parts(cursor.record, &parts, points)?;
            if shape_type.family() == ShapeFamily::PolyLine {
                Ok(assemble_polyline(rings))
            } else {
                Ok(assemble_polygon(rings))
            }
        }
    }
}

/// Split a flat point array into parts using the part start indices.
fn split_parts(
    record: usize,
    parts: &[i32],
    mut points: Vec<Position>,
) -> Result<Vec<Vec<Position>>, ShapefileError> {
    let num_points = points.len();
    let mut starts = Vec::with_capacity(parts.len());

    for &start in parts {
        let start = usize::try_from(start)
            .ok()
            .filter(|s| *s <= num_points)
            .ok_or_else(|| ShapefileError::InvalidRecord {
                record,
                message: format!("part index {} outside {} points", start, num_points),
            })?;
        if starts.last().is_some_and(|prev| start < *prev) {
            return Err(ShapefileError::InvalidRecord {
                record,
                message: "part indices are not ascending".to_string(),
            });
        }
        starts.push(start);
    }

    // Split from the back so each drain is a cheap tail split
    let mut rings = Vec::with_capacity(starts.len());
    for &start in starts.iter().rev() {
        rings.push(points.split_off(start));
    }
    rings.reverse();
    rings.retain(|ring| !ring.is_empty());

    Ok(rings)
}

fn assemble_polyline(mut parts: Vec<Vec<Position>>) -> Option<Geometry> {
    match parts.len() {
        0 => None,
        1 => parts
            .pop()
            .map(|coordinates| Geometry::LineString { coordinates }),
        _ => Some(Geometry::MultiLineString { coordinates: parts }),
    }
}

/// Group rings into polygons.
///
/// Clockwise rings are outer rings. Counter-clockwise rings are holes and
/// belong to the first outer ring containing their first vertex, or to the
/// outer ring that preceded them in the record.
fn assemble_polygon(rings: Vec<Vec<Position>>) -> Option<Geometry> {
    let mut polygons: Vec<Vec<Vec<Position>>> = Vec::new();
    let mut holes: Vec<(Vec<Position>, Option<usize>)> = Vec::new();

    for ring in rings {
        if signed_area(&ring) < 0.0 {
            polygons.push(vec![ring]);
        } else {
            let preceding = polygons.len().checked_sub(1);
            holes.push((ring, preceding));
        }
    }

    if polygons.is_empty() {
        // No winding information to rely on: every ring stands alone
        polygons = holes.into_iter().map(|(ring, _)| vec![ring]).collect();
    } else {
        for (hole, preceding) in holes {
            let owner = polygons
                .iter()
                .position(|polygon| {
                    hole.first()
                        .is_some_and(|vertex| ring_contains(&polygon[0], vertex))
                })
                .or(preceding)
                .unwrap_or(0);
            polygons[owner].push(hole);
        }
    }

    match polygons.len() {
        0 => None,
        1 => polygons
            .pop()
            .map(|coordinates| Geometry::Polygon { coordinates }),
        _ => Some(Geometry::MultiPolygon {
            coordinates: polygons,
        }),
    }
}

/// Shoelace signed area; negative for clockwise rings (y axis up).
fn signed_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    for (a, b) in ring.iter().zip(ring.iter().cycle().skip(1)) {
        sum += a[0] * b[1] - b[0] * a[1];
    }
    sum / 2.0
}

/// Even-odd ray casting point-in-ring test.
fn ring_contains(ring: &[Position], point: &Position) -> bool {
    let (x, y) = (point[0], point[1]);
    let mut inside = false;

    let mut j = ring.len().wrapping_sub(1);
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

// =============================================================================
// Tests
// =============================================================================

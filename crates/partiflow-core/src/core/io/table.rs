use crate::core::data::standard;
use crate::core::data::{
    DataCollection, DataError, ElementKind, Property, PropertyContainer, PropertyData,
};
use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Invalid number '{value}' in column '{column}' on row {row}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Invalid particle data: {0}")]
    Data(#[from] DataError),
}

/// Role of a table column in the resulting particle container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Frame,
    X,
    Y,
    Z,
    Selection,
    Type,
    Radius,
    Custom,
}

impl Column {
    fn classify(header: &str) -> Self {
        match header.to_ascii_lowercase().as_str() {
            "frame" => Column::Frame,
            "x" => Column::X,
            "y" => Column::Y,
            "z" => Column::Z,
            "selection" => Column::Selection,
            "type" => Column::Type,
            "radius" => Column::Radius,
            _ => Column::Custom,
        }
    }
}

#[derive(Default)]
struct FrameRows {
    positions: Vec<Vector3<f64>>,
    selection: Vec<bool>,
    types: Vec<i64>,
    radii: Vec<f64>,
    custom: Vec<Vec<f64>>,
}

pub fn load_particle_table(path: &Path) -> Result<Vec<DataCollection>, TableLoadError> {
    let file = std::fs::File::open(path).map_err(|e| TableLoadError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let frames = read_particle_table(file)?;
    debug!(
        path = %path.display(),
        frames = frames.len(),
        "Loaded particle table."
    );
    Ok(frames)
}

/// Reads a comma-separated particle table into one collection per frame.
///
/// `x`, `y` and `z` are required and become `Position`. An optional `frame`
/// column groups rows into animation frames (rows without it belong to frame
/// 0); `selection`, `type` and `radius` map to their standard properties.
/// Every other column is stored as a float property under its header name.
/// Frames are returned in ascending frame-number order.
pub fn read_particle_table(reader: impl Read) -> Result<Vec<DataCollection>, TableLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns: Vec<Column> = headers.iter().map(Column::classify).collect();
    for (required, name) in [(Column::X, "x"), (Column::Y, "y"), (Column::Z, "z")] {
        if !columns.contains(&required) {
            return Err(TableLoadError::MissingColumn(name));
        }
    }
    let custom_names: Vec<&str> = headers
        .iter()
        .zip(&columns)
        .filter(|(_, c)| **c == Column::Custom)
        .map(|(h, _)| h)
        .collect();
    let has = |column: Column| columns.contains(&column);

    let mut frames: BTreeMap<i64, FrameRows> = BTreeMap::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let mut frame = 0_i64;
        let mut position = Vector3::zeros();
        let mut selected = false;
        let mut particle_type = 0_i64;
        let mut radius = 0.0;
        let mut custom = Vec::with_capacity(custom_names.len());

        for ((field, column), header) in record.iter().zip(&columns).zip(headers.iter()) {
            let float = || parse_number::<f64>(field, header, row);
            match column {
                Column::Frame => frame = parse_number(field, header, row)?,
                Column::X => position.x = float()?,
                Column::Y => position.y = float()?,
                Column::Z => position.z = float()?,
                Column::Selection => selected = parse_number::<i64>(field, header, row)? != 0,
                Column::Type => particle_type = parse_number(field, header, row)?,
                Column::Radius => radius = float()?,
                Column::Custom => custom.push(float()?),
            }
        }

        let rows = frames.entry(frame).or_default();
        rows.positions.push(position);
        rows.selection.push(selected);
        rows.types.push(particle_type);
        rows.radii.push(radius);
        if rows.custom.is_empty() {
            rows.custom = vec![Vec::new(); custom_names.len()];
        }
        for (column, value) in rows.custom.iter_mut().zip(custom) {
            column.push(value);
        }
    }

    frames
        .into_values()
        .map(|rows| {
            let mut particles = PropertyContainer::new(ElementKind::Particles, rows.positions.len());
            particles.insert_property(Property::new(
                standard::POSITION,
                PropertyData::Vector3(rows.positions),
            )?)?;
            if has(Column::Selection) {
                particles.insert_property(Property::from_flags(standard::SELECTION, &rows.selection)?)?;
            }
            if has(Column::Type) {
                particles.insert_property(Property::new(
                    standard::PARTICLE_TYPE,
                    PropertyData::Int(rows.types),
                )?)?;
            }
            if has(Column::Radius) {
                particles.insert_property(Property::new(
                    standard::RADIUS,
                    PropertyData::Float(rows.radii),
                )?)?;
            }
            for (name, values) in custom_names.iter().zip(rows.custom) {
                particles.insert_property(Property::new(name, PropertyData::Float(values))?)?;
            }
            let mut collection = DataCollection::new();
            collection.add(particles.into())?;
            Ok(collection)
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    field: &str,
    column: &str,
    row: usize,
) -> Result<T, TableLoadError> {
    field.parse().map_err(|_| TableLoadError::InvalidNumber {
        column: column.to_string(),
        row,
        value: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn read_single_frame_table() {
        let csv = "x,y,z,selection,type\n0,0,0,1,1\n1.5,2,3,0,2\n";
        let frames = read_particle_table(csv.as_bytes()).unwrap();
        assert_eq!(frames.len(), 1);

        let particles = frames[0].container(ElementKind::Particles).unwrap();
        assert_eq!(particles.element_count(), 2);
        let positions = particles.property(standard::POSITION).unwrap().as_vector3().unwrap();
        assert_eq!(positions[1], Vector3::new(1.5, 2.0, 3.0));
        assert_eq!(
            particles.property(standard::SELECTION).unwrap().flags(),
            Some(vec![true, false])
        );
        assert_eq!(
            particles.property(standard::PARTICLE_TYPE).unwrap().as_int(),
            Some(&[1, 2][..])
        );
        assert!(!particles.contains_property(standard::RADIUS));
    }

    #[test]
    fn rows_are_grouped_by_frame_in_ascending_order() {
        let csv = "frame,x,y,z\n1,5,0,0\n0,1,0,0\n1,6,0,0\n";
        let frames = read_particle_table(csv.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].container(ElementKind::Particles).unwrap().element_count(), 1);
        assert_eq!(frames[1].container(ElementKind::Particles).unwrap().element_count(), 2);
    }

    #[test]
    fn unknown_columns_become_float_properties() {
        let csv = "x,y,z,Temperature\n0,0,0,300.5\n";
        let frames = read_particle_table(csv.as_bytes()).unwrap();
        let particles = frames[0].container(ElementKind::Particles).unwrap();
        assert_eq!(
            particles.property("Temperature").unwrap().as_float(),
            Some(&[300.5][..])
        );
    }

    #[test]
    fn missing_coordinate_column_is_rejected() {
        let result = read_particle_table("x,y\n0,0\n".as_bytes());
        assert!(matches!(result, Err(TableLoadError::MissingColumn("z"))));
    }

    #[test]
    fn invalid_number_reports_row_and_column() {
        let result = read_particle_table("x,y,z\n0,0,0\n0,abc,0\n".as_bytes());
        match result {
            Err(TableLoadError::InvalidNumber { column, row, value }) => {
                assert_eq!(column, "y");
                assert_eq!(row, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn load_particle_table_reads_file_and_reports_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("particles.csv");
        fs::write(&path, "x,y,z\n1,2,3\n").unwrap();
        assert_eq!(load_particle_table(&path).unwrap().len(), 1);

        let missing = load_particle_table(&dir.path().join("missing.csv"));
        assert!(matches!(missing, Err(TableLoadError::Io { .. })));
    }
}

//! Plain-text persistence of item placement
//!
//! One line per opaque render item: the item name followed by the 16
//! components of its world matrix in row-major order, separated by
//! whitespace. Loading matches lines to items by name.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::foundation::math::{Mat4, Mat4Ext};
use crate::scene::render_item::RenderLayer;
use crate::scene::scene_manager::Scene;

/// Errors while saving or loading transforms
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line
    #[error("Line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },
}

/// Write the world transform of every opaque item; returns the lines written
pub fn write_transforms<W: Write>(scene: &Scene, mut writer: W) -> Result<usize, PersistenceError> {
    let mut written = 0;
    for &id in scene.layer(RenderLayer::Opaque) {
        let Some(item) = scene.item(id) else { continue };
        if item.name.is_empty() || item.name.contains(char::is_whitespace) {
            log::warn!("Skipping item '{}': name cannot be stored", item.name);
            continue;
        }

        write!(writer, "{}", item.name)?;
        for value in item.world().to_row_major() {
            write!(writer, " {}", value)?;
        }
        writeln!(writer)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Apply stored transforms to items with matching names; returns the items updated
pub fn read_transforms<R: BufRead>(scene: &mut Scene, reader: R) -> Result<usize, PersistenceError> {
    let mut applied = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else { continue };

        let values = fields
            .map(|field| {
                field.parse::<f32>().map_err(|e| PersistenceError::Parse {
                    line: number,
                    reason: format!("'{}': {}", field, e),
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        let values: [f32; 16] = values.try_into().map_err(|values: Vec<f32>| PersistenceError::Parse {
            line: number,
            reason: format!("expected 16 values for '{}', found {}", name, values.len()),
        })?;

        match scene.item_id(name) {
            Ok(id) => {
                if scene.set_world(id, Mat4::from_row_major(&values)).is_ok() {
                    applied += 1;
                }
            }
            Err(_) => log::warn!("No render item named '{}' (line {})", name, number),
        }
    }
    log::debug!("Restored {} transforms", applied);
    Ok(applied)
}

/// Save opaque item transforms to `path`
pub fn save_transforms(scene: &Scene, path: impl AsRef<Path>) -> Result<usize, PersistenceError> {
    let file = File::create(path.as_ref())?;
    let written = write_transforms(scene, BufWriter::new(file))?;
    log::info!("Saved {} transforms to {}", written, path.as_ref().display());
    Ok(written)
}

/// Load item transforms from `path`
pub fn load_transforms(scene: &mut Scene, path: impl AsRef<Path>) -> Result<usize, PersistenceError> {
    let file = File::open(path.as_ref())?;
    read_transforms(scene, BufReader::new(file))
}

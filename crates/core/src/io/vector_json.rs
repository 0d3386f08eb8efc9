//! JSON layer files: one document holding a layer's schema and features.
//!
//! ```json
//! { "name": "wells",
//!   "schema": { "fields": [{"name": "depth", "type": "real"}],
//!               "geometry_type": "Point", "crs": {"epsg": 4326} },
//!   "features": [ { "geometry": {"Point": {"x": 1.0, "y": 2.0}},
//!                   "properties": {"depth": 12.5} } ] }
//! ```

use crate::error::{Error, Result};
use crate::vector::{Feature, FeatureSink, MemoryLayer, Schema, SinkProvider};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Serialize)]
struct LayerDocRef<'a> {
    name: &'a str,
    schema: &'a Schema,
    features: &'a [Feature],
}

#[derive(Deserialize)]
struct LayerDoc {
    #[serde(default)]
    name: String,
    #[serde(default)]
    schema: Schema,
    #[serde(default)]
    features: Vec<Feature>,
}

fn layer_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("layer")
        .to_string()
}

/// Read a JSON layer file into memory.
pub fn read_layer(path: impl AsRef<Path>) -> Result<MemoryLayer> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let doc: LayerDoc = serde_json::from_reader(BufReader::new(file))?;
    let name = if doc.name.is_empty() { layer_name(path) } else { doc.name };
    debug!(path = %path.display(), features = doc.features.len(), "read JSON layer");
    Ok(MemoryLayer::from_features(&name, doc.schema, doc.features))
}

fn write_doc(path: &Path, name: &str, schema: &Schema, features: &[Feature]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &LayerDocRef { name, schema, features })?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Write a schema and features as a JSON layer file.
pub fn write_layer(path: impl AsRef<Path>, schema: &Schema, features: &[Feature]) -> Result<()> {
    let path = path.as_ref();
    write_doc(path, &layer_name(path), schema, features)
}

/// File sink that buffers features and rewrites the document on flush.
///
/// A sink dropped without a successful flush removes its file, so a failed
/// run leaves no empty layer behind.
#[derive(Debug)]
pub struct JsonLayerSink {
    id: String,
    path: PathBuf,
    name: String,
    schema: Schema,
    features: Vec<Feature>,
    flushed: bool,
}

impl JsonLayerSink {
    /// Create (or truncate) the file immediately so an unwritable
    /// destination fails here rather than at the end of a run.
    pub fn create(path: impl AsRef<Path>, schema: &Schema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let name = layer_name(&path);
        write_doc(&path, &name, schema, &[])?;
        Ok(Self {
            id: path.display().to_string(),
            path,
            name,
            schema: schema.clone(),
            features: Vec::new(),
            flushed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeatureSink for JsonLayerSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn add_feature(&mut self, feature: Feature) -> Result<()> {
        self.features.push(feature);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        write_doc(&self.path, &self.name, &self.schema, &self.features)?;
        self.flushed = true;
        debug!(path = %self.path.display(), features = self.features.len(), "flushed JSON layer");
        Ok(())
    }
}

impl Drop for JsonLayerSink {
    fn drop(&mut self) {
        if !self.flushed {
            debug!(path = %self.path.display(), "JSON layer never flushed, removing");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Creates [`JsonLayerSink`]s for `.json` destinations.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLayerProvider;

impl SinkProvider for JsonLayerProvider {
    fn create_sink(&self, destination: &str, schema: &Schema) -> Result<Box<dyn FeatureSink>> {
        let path = Path::new(destination);
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(Error::Config(format!(
                "feature sink destination must be a .json file: {}",
                destination
            )));
        }
        Ok(Box::new(JsonLayerSink::create(path, schema)?))
    }
}

use crate::error::{Result, VectorIndexError};
use crate::filter::{FilterPredicate, PACK_COLUMN, VIDEO_COLUMN};
use crate::index::VectorIndex;
use crate::record::{KeyframeHit, KeyframeRecord, UNRANKED_SCORE};
use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::DistanceType;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::table::Table;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FRAME_COLUMN: &str = "frame";
const FRAME_INDEX_COLUMN: &str = "frame_index";
const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

/// Configuration for a LanceDB-backed keyframe index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanceIndexConfig {
    /// Directory holding the LanceDB database
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Table holding the keyframe vectors
    #[serde(default = "default_table")]
    pub table: String,

    /// Dimension of the stored vectors
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_path() -> PathBuf {
    PathBuf::from("data/keyframes.lance")
}

fn default_table() -> String {
    "keyframe_collection".to_string()
}

fn default_dimension() -> usize {
    512
}

impl Default for LanceIndexConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            table: default_table(),
            dimension: default_dimension(),
        }
    }
}

impl LanceIndexConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.table.trim().is_empty() {
            return Err("table must not be empty".to_string());
        }
        if self.dimension == 0 {
            return Err("dimension must be > 0".to_string());
        }
        Ok(())
    }
}

/// Keyframe vector index stored in a LanceDB table
pub struct LanceKeyframeIndex {
    table: Table,
    config: LanceIndexConfig,
}

impl LanceKeyframeIndex {
    /// Open the table at `config.path`, creating an empty one if it does not exist
    pub async fn open(config: LanceIndexConfig) -> Result<Self> {
        config
            .validate()
            .map_err(VectorIndexError::Initialization)?;

        info!("Opening keyframe index at {}", config.path.display());

        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let uri = path_to_uri(&config.path)?;
        let connection = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| VectorIndexError::Initialization(e.to_string()))?;

        let table = Self::open_or_create_table(&connection, &config).await?;

        info!("Keyframe index '{}' ready", config.table);
        Ok(Self { table, config })
    }

    async fn open_or_create_table(
        connection: &Connection,
        config: &LanceIndexConfig,
    ) -> Result<Table> {
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| VectorIndexError::Initialization(e.to_string()))?;

        if table_names.contains(&config.table) {
            debug!("Opening existing table '{}'", config.table);
            connection
                .open_table(&config.table)
                .execute()
                .await
                .map_err(|e| VectorIndexError::Initialization(e.to_string()))
        } else {
            debug!("Creating new table '{}'", config.table);
            connection
                .create_empty_table(&config.table, schema(config.dimension))
                .execute()
                .await
                .map_err(|e| VectorIndexError::Initialization(e.to_string()))
        }
    }

    /// Seed the table with keyframes
    pub async fn add_keyframes(&self, keyframes: Vec<KeyframeRecord>) -> Result<()> {
        if keyframes.is_empty() {
            return Ok(());
        }

        if let Some(bad) = keyframes
            .iter()
            .find(|k| k.vector.len() != self.config.dimension)
        {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: bad.vector.len(),
            });
        }

        info!("Adding {} keyframes to '{}'", keyframes.len(), self.config.table);

        let schema = schema(self.config.dimension);
        let batch = records_to_batch(&keyframes, schema.clone(), self.config.dimension)?;

        self.table
            .add(Box::new(RecordBatchIterator::new(
                vec![Ok(batch)].into_iter(),
                schema,
            )))
            .execute()
            .await
            .map_err(|e| VectorIndexError::AdditionFailed(e.to_string()))?;

        Ok(())
    }

    /// Total number of keyframes in the table
    pub async fn count(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }

    pub fn config(&self) -> &LanceIndexConfig {
        &self.config
    }
}

#[async_trait]
impl VectorIndex for LanceKeyframeIndex {
    async fn search_similar(
        &self,
        vector: &[f32],
        top_k: usize,
        predicate: Option<&FilterPredicate>,
    ) -> Result<Vec<KeyframeHit>> {
        if vector.len() != self.config.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut query = self
            .table
            .vector_search(vector.to_vec())
            .map_err(|e| VectorIndexError::SearchFailed(e.to_string()))?
            .distance_type(DistanceType::Cosine)
            .select(Select::columns(&payload_columns()))
            .limit(top_k);

        if let Some(predicate) = predicate {
            let sql = predicate.to_sql();
            debug!("Vector search filter: {sql}");
            query = query.only_if(sql);
        }

        let batches: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| VectorIndexError::SearchFailed(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| VectorIndexError::SearchFailed(e.to_string()))?;

        let mut hits = Vec::new();
        for batch in &batches {
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| {
                    VectorIndexError::SearchFailed("Missing _distance column".into())
                })?;

            // Cosine distance lies in [0, 2]; flip it so higher means more similar
            hits.extend(read_hits(batch, |row| 1.0 - distances.value(row))?);
        }

        debug!("Lance search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn scroll_all(
        &self,
        predicate: Option<&FilterPredicate>,
        limit: usize,
    ) -> Result<Vec<KeyframeHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut query = self
            .table
            .query()
            .select(Select::columns(&payload_columns()))
            .limit(limit);

        if let Some(predicate) = predicate {
            query = query.only_if(predicate.to_sql());
        }

        let batches: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| VectorIndexError::ScrollFailed(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| VectorIndexError::ScrollFailed(e.to_string()))?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(read_hits(batch, |_| UNRANKED_SCORE)?);
        }
        Ok(hits)
    }
}

fn payload_columns() -> [&'static str; 4] {
    [PACK_COLUMN, VIDEO_COLUMN, FRAME_COLUMN, FRAME_INDEX_COLUMN]
}

fn path_to_uri(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| VectorIndexError::Initialization("Invalid database path".into()))
}

fn schema(dimension: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(PACK_COLUMN, DataType::Utf8, false),
        Field::new(VIDEO_COLUMN, DataType::Utf8, false),
        Field::new(FRAME_COLUMN, DataType::Utf8, false),
        Field::new(FRAME_INDEX_COLUMN, DataType::UInt64, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(vector_item_field(), dimension as i32),
            false,
        ),
    ]))
}

fn vector_item_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Float32, true))
}

fn records_to_batch(
    records: &[KeyframeRecord],
    schema: SchemaRef,
    dimension: usize,
) -> Result<RecordBatch> {
    let packs: Vec<&str> = records.iter().map(|r| r.pack.as_str()).collect();
    let videos: Vec<&str> = records.iter().map(|r| r.video.as_str()).collect();
    let frames: Vec<&str> = records.iter().map(|r| r.frame.as_str()).collect();
    let frame_indices: Vec<u64> = records.iter().map(|r| r.frame_index).collect();
    let values: Vec<f32> = records
        .iter()
        .flat_map(|r| r.vector.iter().copied())
        .collect();

    let vectors = FixedSizeListArray::try_new(
        vector_item_field(),
        dimension as i32,
        Arc::new(Float32Array::from(values)),
        None,
    )?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(packs)),
        Arc::new(StringArray::from(videos)),
        Arc::new(StringArray::from(frames)),
        Arc::new(UInt64Array::from(frame_indices)),
        Arc::new(vectors),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| VectorIndexError::SearchFailed(format!("Invalid {name} column")))
}

fn read_hits(batch: &RecordBatch, score_of: impl Fn(usize) -> f32) -> Result<Vec<KeyframeHit>> {
    let packs = string_column(batch, PACK_COLUMN)?;
    let videos = string_column(batch, VIDEO_COLUMN)?;
    let frames = string_column(batch, FRAME_COLUMN)?;
    let frame_indices = batch
        .column_by_name(FRAME_INDEX_COLUMN)
        .and_then(|col| col.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| VectorIndexError::SearchFailed("Invalid frame_index column".into()))?;

    Ok((0..batch.num_rows())
        .filter(|&row| !packs.is_null(row) && !videos.is_null(row))
        .map(|row| KeyframeHit {
            pack: packs.value(row).to_string(),
            video: videos.value(row).to_string(),
            frame: frames.value(row).to_string(),
            frame_index: frame_indices.value(row),
            score: score_of(row),
        })
        .collect())
}

//! Provider and sink implementations.
//!
//! Recordings, predictor weights and results move through safetensors files
//! (hand-rolled header parsing — raw bytes → ndarray is all that's needed);
//! grids and electrode coordinates come from TSV files.

use crate::channels::ChannelSelection;
use crate::context::RunContext;
use crate::grid::{Grid, Hemisphere};
use crate::offline::OfflineResult;
use crate::predict::{GridPredictors, LinearPredictor, Predictor};
use crate::projection::PatientCoords;
use anyhow::{bail, ensure, Context, Result};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;

// ── Low-level safetensors parsing ─────────────────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    let header: HashMap<String, serde_json::Value> = serde_json::from_slice(&bytes[8..8 + n])
        .context("failed to parse safetensors header")?;
    Ok((header, 8 + n))
}

/// Read one tensor as f64, accepting F32 or F64 storage.
fn read_tensor_f64(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("tensor entry missing data_offsets")?;
    let s = offsets[0].as_u64().unwrap() as usize;
    let e = offsets[1].as_u64().unwrap() as usize;
    let raw = &bytes[data_start + s..data_start + e];
    match entry["dtype"].as_str() {
        Some("F64") => Ok(raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
            .collect()),
        Some("F32") => Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()) as f64)
            .collect()),
        other => bail!("unsupported tensor dtype {other:?}"),
    }
}

fn shape_of(entry: &serde_json::Value) -> Vec<usize> {
    entry["shape"]
        .as_array()
        .map(|a| a.iter().map(|v| v.as_u64().unwrap() as usize).collect())
        .unwrap_or_default()
}

// ── Recording provider ────────────────────────────────────────────────────────

/// One raw recording: sample matrix, names, rates.
pub struct Recording {
    /// `(channels × samples)`, recording order.
    pub data: Array2<f64>,
    /// Sampling rate, Hz.
    pub sfreq: f64,
    /// Line-noise frequency for this subject, Hz.
    pub line_noise: f64,
    /// Channel names, one per data row.
    pub ch_names: Vec<String>,
}

impl Recording {
    /// Load from a safetensors file with keys `data` ([C, T]), `sfreq` ([1]),
    /// `line_noise` ([1]) and `ch_names` (newline-joined UTF-8 bytes).
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading recording {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let entry = header.get("data").context("missing 'data' tensor")?;
        let shape = shape_of(entry);
        ensure!(shape.len() == 2, "'data' must be 2-D, got shape {shape:?}");
        let values = read_tensor_f64(&bytes, data_start, entry)?;
        let data = Array2::from_shape_vec((shape[0], shape[1]), values)?;

        let sfreq_entry = header.get("sfreq").context("missing 'sfreq' tensor")?;
        let sfreq = read_tensor_f64(&bytes, data_start, sfreq_entry)?[0];
        let noise_entry = header
            .get("line_noise")
            .context("missing 'line_noise' tensor")?;
        let line_noise = read_tensor_f64(&bytes, data_start, noise_entry)?[0];

        let names_entry = header.get("ch_names").context("missing 'ch_names' tensor")?;
        let offsets = names_entry["data_offsets"]
            .as_array()
            .context("ch_names missing data_offsets")?;
        let s = offsets[0].as_u64().unwrap() as usize;
        let e = offsets[1].as_u64().unwrap() as usize;
        let raw_str = std::str::from_utf8(&bytes[data_start + s..data_start + e])?;
        let ch_names: Vec<String> = raw_str
            .split('\n')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        ensure!(
            ch_names.len() == data.nrows(),
            "{} channel names for {} data rows",
            ch_names.len(),
            data.nrows()
        );

        Ok(Self { data, sfreq, line_noise, ch_names })
    }
}

// ── Grid and coordinate providers (TSV) ───────────────────────────────────────

/// Parse a whitespace/tab separated 3-column point file; lines that do not
/// start with a number (headers) are skipped.
fn parse_points(text: &str, path: &Path) -> Result<Array2<f64>> {
    let mut rows: Vec<[f64; 3]> = Vec::new();
    for (ln, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() || fields[0].parse::<f64>().is_err() {
            continue;
        }
        ensure!(
            fields.len() >= 3,
            "{}:{}: expected 3 coordinates, got {}",
            path.display(),
            ln + 1,
            fields.len()
        );
        let mut p = [0.0; 3];
        for (i, f) in fields[..3].iter().enumerate() {
            p[i] = f
                .parse()
                .with_context(|| format!("{}:{}: bad number '{f}'", path.display(), ln + 1))?;
        }
        rows.push(p);
    }
    let mut arr = Array2::zeros((rows.len(), 3));
    for (i, p) in rows.iter().enumerate() {
        arr[[i, 0]] = p[0];
        arr[[i, 1]] = p[1];
        arr[[i, 2]] = p[2];
    }
    Ok(arr)
}

/// Load the four canonical grid halves from `<dir>/{cortex,subcortex}_{left,right}.tsv`.
pub fn read_grid(dir: &Path) -> Result<Grid> {
    let load = |name: &str| -> Result<Array2<f64>> {
        let path = dir.join(name);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading grid file {}", path.display()))?;
        parse_points(&text, &path)
    };
    Ok(Grid {
        cortex_left: load("cortex_left.tsv")?,
        cortex_right: load("cortex_right.tsv")?,
        subcortex_left: load("subcortex_left.tsv")?,
        subcortex_right: load("subcortex_right.tsv")?,
    })
}

/// Read electrode coordinates for the used channels from a TSV of
/// `name x y z` rows.
///
/// Every cortex/subcortex channel must have a row; a missing channel is a
/// fatal configuration error naming it.
pub fn read_coordinates(
    path: &Path,
    ch_names: &[String],
    selection: &ChannelSelection,
) -> Result<PatientCoords> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading electrode file {}", path.display()))?;

    let mut by_name: HashMap<&str, [f64; 3]> = HashMap::new();
    for line in text.lines().skip_while(|l| l.starts_with("name")) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        let mut p = [0.0; 3];
        let mut ok = true;
        for (i, f) in fields[1..4].iter().enumerate() {
            match f.parse() {
                Ok(v) => p[i] = v,
                Err(_) => ok = false,
            }
        }
        if ok {
            by_name.insert(fields[0], p);
        }
    }

    let gather = |indices: &[usize]| -> Result<Option<Array2<f64>>> {
        if indices.is_empty() {
            return Ok(None);
        }
        let mut arr = Array2::zeros((indices.len(), 3));
        for (row, &ch) in indices.iter().enumerate() {
            let name = &ch_names[ch];
            let p = by_name.get(name.as_str()).with_context(|| {
                format!("no coordinate row for channel '{name}' in {}", path.display())
            })?;
            arr[[row, 0]] = p[0];
            arr[[row, 1]] = p[1];
            arr[[row, 2]] = p[2];
        }
        Ok(Some(arr))
    };

    Ok(PatientCoords {
        cortex: gather(&selection.cortex)?,
        subcortex: gather(&selection.subcortex)?,
    })
}

// ── Predictor provider ────────────────────────────────────────────────────────

/// Load per-grid-point linear models from a safetensors file with
/// `weights_<point>` / `bias_<point>` tensors; points without tensors get no
/// model (typically the inactive ones).
pub fn load_predictors(path: &Path, n_points: usize) -> Result<GridPredictors> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading model file {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let mut models: Vec<Option<Box<dyn Predictor>>> = Vec::with_capacity(n_points);
    for point in 0..n_points {
        let weights = match header.get(&format!("weights_{point}")) {
            Some(entry) => read_tensor_f64(&bytes, data_start, entry)?,
            None => {
                models.push(None);
                continue;
            }
        };
        let bias = match header.get(&format!("bias_{point}")) {
            Some(entry) => read_tensor_f64(&bytes, data_start, entry)?[0],
            None => 0.0,
        };
        models.push(Some(Box::new(LinearPredictor { weights, bias })));
    }
    Ok(GridPredictors::new(models))
}

// ── Result sink ───────────────────────────────────────────────────────────────

/// Safetensors writer for F64/I32 tensors and raw UTF-8 blobs.
pub struct ResultWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl Default for ResultWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultWriter {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    /// Store a string list as newline-joined UTF-8 bytes.
    pub fn add_strings(&mut self, name: &str, values: &[String]) {
        let joined = values.join("\n");
        let bytes = joined.into_bytes();
        let len = bytes.len();
        self.entries.push((name.to_string(), bytes, "U8", vec![len]));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(
                name.clone(),
                serde_json::json!({
                    "dtype": dtype,
                    "shape": shape,
                    "data_offsets": [offset, offset + data.len()],
                }),
            );
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes
            .into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

/// Identifiers of the recording a result record came from.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub subject: String,
    pub session: String,
    pub run: String,
}

/// Persist one offline run as a single write-once record: feature arrays,
/// labels, and the run metadata needed to interpret them later without the
/// original settings (ids, hemisphere, rates, projection matrices).
pub fn write_result(
    path: &Path,
    result: &OfflineResult,
    ctx: &RunContext,
    meta: &RunMeta,
) -> Result<()> {
    let mut w = ResultWriter::new();

    let dim = result.raw_features.dim();
    w.add_f64(
        "raw_features",
        result.raw_features.as_slice().unwrap(),
        &[dim.0, dim.1, dim.2],
    );
    let dim = result.projected_features.dim();
    w.add_f64(
        "projected_features",
        result.projected_features.as_slice().unwrap(),
        &[dim.0, dim.1, dim.2],
    );
    let dim = result.label_features.dim();
    w.add_f64(
        "label_features",
        result.label_features.as_slice().unwrap(),
        &[dim.0, dim.1],
    );
    let dim = result.label_corrected.dim();
    w.add_f64(
        "label_corrected",
        result.label_corrected.as_slice().unwrap(),
        &[dim.0, dim.1],
    );
    w.add_f64(
        "label_onoff",
        result.label_onoff.as_slice().unwrap(),
        &[dim.0, dim.1],
    );
    w.add_f64(
        "label_thresholds",
        &result.label_thresholds,
        &[result.label_thresholds.len()],
    );
    let sample_idx: Vec<i32> = result.sample_idx.iter().map(|&v| v as i32).collect();
    w.add_i32("sample_idx", &sample_idx, &[sample_idx.len()]);
    let active: Vec<i32> = ctx.active.iter().map(|&a| a as i32).collect();
    w.add_i32("active_grid_points", &active, &[active.len()]);
    w.add_strings("label_names", &ctx.label_names);

    w.add_f64("sfreq", &[ctx.fs as f64], &[1]);
    w.add_f64("feature_rate", &[ctx.fs_new as f64], &[1]);
    let hemi = match ctx.hemisphere {
        Hemisphere::Left => "left",
        Hemisphere::Right => "right",
    };
    w.add_strings("hemisphere", &[hemi.to_string()]);
    w.add_strings("subject", &[meta.subject.clone()]);
    w.add_strings("session", &[meta.session.clone()]);
    w.add_strings("run", &[meta.run.clone()]);

    if let Some(m) = &ctx.projection.cortex {
        w.add_f64("projection_cortex", m.as_slice().unwrap(), &[m.nrows(), m.ncols()]);
    }
    if let Some(m) = &ctx.projection.subcortex {
        w.add_f64(
            "projection_subcortex",
            m.as_slice().unwrap(),
            &[m.nrows(), m.ncols()],
        );
    }

    w.write(path)
}

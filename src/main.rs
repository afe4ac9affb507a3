// Compute Pearson or tie-tolerant Spearman correlation matrices from a TSV file.
// Each input line is one variable; the result is written as a tar.gz'd TSV.

use csv::{ReaderBuilder, WriterBuilder};
use flate2::{
    read::{GzDecoder, MultiGzDecoder},
    write::GzEncoder,
    Compression,
};
use ndarray::{Array1, Array2};
use std::{
    collections::HashMap,
    env,
    error::Error,
    fs::File,
    io::{Cursor, Read},
    time::Instant,
};
use strum_macros::{Display, EnumString};
use tar::{Archive, Builder, Header};
use tracing::info;

use tiecorr::{CorrelationConfig, DegeneratePolicy, MissingPolicy};

#[derive(EnumString, Display)]
#[strum(ascii_case_insensitive)]
enum CorrelationType {
    #[strum(serialize = "Pearson")]
    Pearson,
    #[strum(serialize = "Spearman")]
    Spearman,
}

struct Args {
    file_path: String,
    correlation_type: CorrelationType,
    num_threads: Option<usize>,
    time_tracking: bool,
    config: CorrelationConfig,
}

const USAGE: &str = "Usage: tiecorr <input_file> <correlation_type> [num_threads] [--time] \
[--strict] [--missing pairwise|reject] [--degenerate nan|error]\n\
Correlation types: pearson, spearman\n\
num_threads: number of threads to use (default: all available)\n\
--time: enable detailed timing output\n\
--strict: reject missing values and zero-variance rows";

/// Variables become columns: the matrix is `samples x variables`.
fn build_data_matrix(row_ids: &[String], row_data: &HashMap<String, Array1<f64>>) -> Array2<f64> {
    let n_vars = row_ids.len();
    let n_samples = row_data.values().next().map(|v| v.len()).unwrap_or(0);

    let mut matrix = Array2::<f64>::zeros((n_samples, n_vars));
    for (j, row_id) in row_ids.iter().enumerate() {
        if let Some(values) = row_data.get(row_id) {
            matrix.column_mut(j).assign(values);
        }
    }
    matrix
}

fn read_matrix_data<R: Read>(reader: R) -> Result<HashMap<String, Array1<f64>>, Box<dyn Error>> {
    let mut row_data = HashMap::new();
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);

    // row ID + at least two observations
    let header_len = rdr.headers()?.len();
    if header_len < 3 {
        return Err("Input file must contain at least two observation columns".into());
    }

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 2;

        let raw_row_id = record.get(0).unwrap_or("").trim();
        if raw_row_id.is_empty() {
            return Err(format!("Empty row ID encountered on line {}", line).into());
        }
        if row_data.contains_key(raw_row_id) {
            return Err(format!(
                "Duplicate row ID '{}' encountered on line {}",
                raw_row_id, line
            )
            .into());
        }
        if record.len() != header_len {
            return Err(format!(
                "Line {} has {} fields, header has {}",
                line,
                record.len(),
                header_len
            )
            .into());
        }

        let values: Array1<f64> = record
            .iter()
            .skip(1)
            .map(|s| s.trim().parse().unwrap_or(f64::NAN))
            .collect::<Vec<_>>()
            .into();

        row_data.insert(raw_row_id.to_string(), values);
    }
    Ok(row_data)
}

fn load(file_path: &str) -> Result<HashMap<String, Array1<f64>>, Box<dyn Error>> {
    if file_path.ends_with(".tar.gz") {
        let file = File::open(file_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.header().entry_type().is_file() {
                return read_matrix_data(&mut entry);
            }
        }
        Err("No readable file found in tar archive".into())
    } else if file_path.ends_with(".gz") {
        read_matrix_data(MultiGzDecoder::new(File::open(file_path)?))
    } else {
        read_matrix_data(File::open(file_path)?)
    }
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        return Err(USAGE.into());
    }

    let correlation_type: CorrelationType = args[2].parse()?;
    let mut num_threads = None;
    let mut time_tracking = false;
    let mut config = CorrelationConfig::default();

    let mut rest = args.iter().skip(3);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--time" => time_tracking = true,
            "--strict" => config = CorrelationConfig::strict(),
            "--missing" => {
                let value = rest.next().ok_or("--missing needs a value")?;
                config = config.with_missing(value.parse::<MissingPolicy>()?);
            }
            "--degenerate" => {
                let value = rest.next().ok_or("--degenerate needs a value")?;
                config = config.with_degenerate(value.parse::<DegeneratePolicy>()?);
            }
            other => match other.parse::<usize>() {
                Ok(threads) => num_threads = Some(threads),
                Err(_) => return Err(format!("Unknown argument: {}\n{}", other, USAGE).into()),
            },
        }
    }

    Ok(Args {
        file_path: args[1].clone(),
        correlation_type,
        num_threads,
        time_tracking,
        config,
    })
}

fn output_stem(file_path: &str) -> &str {
    let stem = std::path::Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data");
    stem.strip_suffix(".tar").unwrap_or(stem)
}

fn write_tsv(row_ids: &[String], corr: &Array2<f64>) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut csv_buf = Vec::<u8>::new();
    {
        let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(&mut csv_buf);
        wtr.write_record(std::iter::once("").chain(row_ids.iter().map(String::as_str)))?;
        for (i, row_id) in row_ids.iter().enumerate() {
            let row_vals: Vec<String> = corr.row(i).iter().map(|&r| r.to_string()).collect();
            wtr.write_record(
                std::iter::once(row_id.as_str()).chain(row_vals.iter().map(String::as_str)),
            )?;
        }
        wtr.flush()?;
    }
    Ok(csv_buf)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;

    if let Some(threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| format!("Failed to set thread pool: {}", e))?;
        info!("Using {} threads.", threads);
    } else {
        info!("Using all available CPU cores.");
    }

    let load_start = Instant::now();
    let row_data = load(&args.file_path)?;
    let load_duration = load_start.elapsed();

    let mut row_ids: Vec<String> = row_data.keys().cloned().collect();
    row_ids.sort();
    let data_matrix = build_data_matrix(&row_ids, &row_data);
    info!(
        "Matrix dimensions: {} variables x {} observations",
        data_matrix.ncols(),
        data_matrix.nrows()
    );

    let calc_start = Instant::now();
    info!("Computing {} correlations...", args.correlation_type);
    let correlation_matrix = match args.correlation_type {
        CorrelationType::Pearson => tiecorr::pearson::pairwise_with(&data_matrix, &args.config)?,
        CorrelationType::Spearman => tiecorr::spearman::pairwise_with(&data_matrix, &args.config)?,
    };
    let calc_duration = calc_start.elapsed();

    let output_start = Instant::now();
    let csv_buf = write_tsv(&row_ids, &correlation_matrix)?;

    let suffix = args.correlation_type.to_string().to_lowercase();
    let stem = output_stem(&args.file_path);
    let tar_gz_path = format!("{}_{}_correlations.tar.gz", stem, suffix);
    let enc = GzEncoder::new(File::create(&tar_gz_path)?, Compression::default());
    let mut tar_builder = Builder::new(enc);

    let mut header = Header::new_gnu();
    header.set_size(csv_buf.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();

    let csv_name = format!("{}_{}_correlations.tsv", stem, suffix);
    tar_builder.append_data(&mut header, csv_name, &mut Cursor::new(csv_buf))?;
    tar_builder.into_inner()?.finish()?;
    let output_duration = output_start.elapsed();
    info!("Wrote {}", tar_gz_path);

    if args.time_tracking {
        let total = load_duration + calc_duration + output_duration;
        info!("Data loading:            {:8.3} seconds", load_duration.as_secs_f64());
        info!("Correlation calculation: {:8.3} seconds", calc_duration.as_secs_f64());
        info!("Output writing:          {:8.3} seconds", output_duration.as_secs_f64());
        info!("Total time:              {:8.3} seconds", total.as_secs_f64());
    }

    Ok(())
}

//! Write a deterministic synthetic hourly rental dataset (2011–2012) as CSV
//! and Parquet, laid out like the Kaggle `train.csv`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{Datelike, NaiveDate, Weekday};
use clap::Parser;
use parquet::arrow::ArrowWriter;

use bikeshare_dashboard::RentalRecord;

#[derive(Parser)]
#[command(name = "generate-sample")]
#[command(about = "Write a synthetic hourly bike-rental dataset", long_about = None)]
struct Cli {
    /// Directory receiving sample_rentals.csv and sample_rentals.parquet
    #[arg(long, short, default_value = ".")]
    output_dir: PathBuf,

    /// PRNG seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Keep only days 1–19 of each month, like the Kaggle training split
    #[arg(long)]
    train_split: bool,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// Mean hourly demand on working days: commute peaks at 8:00 and 17:00–18:00.
const WORKDAY_PROFILE: [f64; 24] = [
    25.0, 10.0, 5.0, 3.0, 5.0, 20.0, 90.0, 260.0, 420.0, 230.0, 130.0, 150.0,
    190.0, 185.0, 170.0, 185.0, 280.0, 500.0, 470.0, 330.0, 240.0, 180.0, 130.0, 75.0,
];

// Weekends and holidays: one broad midday hump.
const OFFDAY_PROFILE: [f64; 24] = [
    95.0, 75.0, 55.0, 25.0, 8.0, 8.0, 20.0, 45.0, 100.0, 170.0, 250.0, 310.0,
    350.0, 360.0, 355.0, 350.0, 335.0, 310.0, 270.0, 220.0, 170.0, 140.0, 115.0, 85.0,
];

/// Dataset season code: Jan–Mar 1, Apr–Jun 2, Jul–Sep 3, Oct–Dec 4.
fn season_code(month: u32) -> i64 {
    ((month - 1) / 3 + 1) as i64
}

fn is_holiday(date: NaiveDate) -> bool {
    matches!(
        (date.month(), date.day()),
        (1, 1) | (7, 4) | (11, 11) | (12, 25)
    )
}

fn generate(rng: &mut SimpleRng, train_split: bool) -> Result<Vec<RentalRecord>> {
    let start = NaiveDate::from_ymd_opt(2011, 1, 1).context("invalid start date")?;
    let mut records = Vec::new();

    for date in start.iter_days().take_while(|d| d.year() <= 2012) {
        if train_split && date.day() > 19 {
            continue;
        }
        let holiday = is_holiday(date);
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        let workingday = !holiday && !weekend;

        let season = season_code(date.month());
        let season_factor = [0.55, 1.0, 1.15, 0.95][(season - 1) as usize];
        let growth = if date.year() == 2012 { 1.65 } else { 1.0 };
        // Mean temperature follows the calendar, peaking in July.
        let month_temp = 20.0 + 12.0 * ((date.month() as f64 - 7.0) * std::f64::consts::PI / 6.0).cos();

        for hour in 0..24u32 {
            let weather: u8 = match rng.next_f64() {
                p if p < 0.66 => 1,
                p if p < 0.92 => 2,
                _ => 3,
            };
            let weather_factor = [1.0, 0.8, 0.45][(weather - 1) as usize];

            let base = if workingday {
                WORKDAY_PROFILE[hour as usize]
            } else {
                OFFDAY_PROFILE[hour as usize]
            };
            let noise = rng.gauss(1.0, 0.15).max(0.05);
            let total = (base * season_factor * growth * weather_factor * noise).round() as u64;
            let casual_share = if workingday { 0.12 } else { 0.35 };
            let casual = (total as f64 * casual_share).round() as u64;

            let diurnal = 4.0 * ((hour as f64 - 15.0) * std::f64::consts::PI / 12.0).cos();
            let temp = (month_temp + diurnal + rng.gauss(0.0, 2.0)).max(0.82);
            let humidity = rng.gauss(62.0, 15.0).clamp(8.0, 100.0).round();
            let windspeed = rng.gauss(12.0, 6.0).max(0.0);

            records.push(RentalRecord {
                datetime: format!("{} {hour:02}:00:00", date.format("%Y-%m-%d")),
                season,
                holiday: Some(holiday as u8),
                workingday: workingday as u8,
                weather: Some(weather),
                temp: Some((temp * 100.0).round() / 100.0),
                atemp: Some(((temp * 1.12 + 1.5) * 1000.0).round() / 1000.0),
                humidity: Some(humidity),
                windspeed: Some((windspeed * 10_000.0).round() / 10_000.0),
                casual,
                registered: total - casual,
                total,
            });
        }
    }
    Ok(records)
}

fn to_batch(records: &[RentalRecord]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("datetime", DataType::Utf8, false),
        Field::new("season", DataType::Int64, false),
        Field::new("holiday", DataType::Int64, true),
        Field::new("workingday", DataType::Int64, false),
        Field::new("weather", DataType::Int64, true),
        Field::new("temp", DataType::Float64, true),
        Field::new("atemp", DataType::Float64, true),
        Field::new("humidity", DataType::Float64, true),
        Field::new("windspeed", DataType::Float64, true),
        Field::new("casual", DataType::Int64, false),
        Field::new("registered", DataType::Int64, false),
        Field::new("count", DataType::Int64, false),
    ]));

    let int = |f: fn(&RentalRecord) -> Option<i64>| -> ArrayRef {
        Arc::new(records.iter().map(f).collect::<Int64Array>())
    };
    let float = |f: fn(&RentalRecord) -> Option<f64>| -> ArrayRef {
        Arc::new(records.iter().map(f).collect::<Float64Array>())
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.datetime.as_str()))),
        int(|r| Some(r.season)),
        int(|r| r.holiday.map(i64::from)),
        int(|r| Some(i64::from(r.workingday))),
        int(|r| r.weather.map(i64::from)),
        float(|r| r.temp),
        float(|r| r.atemp),
        float(|r| r.humidity),
        float(|r| r.windspeed),
        int(|r| Some(r.casual as i64)),
        int(|r| Some(r.registered as i64)),
        int(|r| Some(r.total as i64)),
    ];

    RecordBatch::try_new(schema, columns).context("building record batch")
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut rng = SimpleRng::new(cli.seed);
    let records = generate(&mut rng, cli.train_split)?;

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;

    // CSV
    let csv_path = cli.output_dir.join("sample_rentals.csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    // Parquet
    let batch = to_batch(&records)?;
    let parquet_path = cli.output_dir.join("sample_rentals.parquet");
    let file = std::fs::File::create(&parquet_path)
        .with_context(|| format!("creating {}", parquet_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;

    let preview = pretty_format_batches(&[batch.slice(0, batch.num_rows().min(5))])?;
    log::info!("First rows:\n{preview}");
    println!(
        "Wrote {} hourly records to {} and {}",
        records.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
